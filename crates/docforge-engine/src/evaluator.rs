/*
 * evaluator.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Rendering of parsed parts against merge data.

use quick_xml::escape::partial_escape;
use serde_json::Value;

use crate::error::{EngineError, EngineResult, TagError};
use crate::options::{MergeOptions, MissingValue};
use crate::parser::Node;
use crate::tags::Placeholder;
use crate::value::{Scope, is_truthy, to_text};
use crate::xml::PRESERVED_TEXT_START;

/// Markup inserted for a line break inside run text.
const LINE_BREAK: &str = "</w:t><w:br/>";

/// Render parsed nodes to XML.
///
/// # Errors
///
/// Returns [`EngineError::Template`] when a value is missing and the
/// options ask for missing values to be reported.
pub fn render(
    part: &str,
    nodes: &[Node],
    data: &Value,
    options: &MergeOptions,
) -> EngineResult<String> {
    let mut renderer = Renderer {
        part,
        options,
        errors: Vec::new(),
        out: String::new(),
    };
    renderer.render_nodes(nodes, &Scope::root(data));

    if renderer.errors.is_empty() {
        Ok(renderer.out)
    } else {
        Err(EngineError::Template {
            errors: renderer.errors,
        })
    }
}

struct Renderer<'a> {
    part: &'a str,
    options: &'a MergeOptions,
    errors: Vec<TagError>,
    out: String,
}

impl Renderer<'_> {
    fn render_nodes(&mut self, nodes: &[Node], scope: &Scope<'_>) {
        for node in nodes {
            match node {
                Node::Token(token) => token.write_to(&mut self.out),
                Node::Variable(tag) => self.render_variable(tag, scope),
                Node::Section {
                    tag,
                    inverted,
                    body,
                } => self.render_section(tag, *inverted, body, scope),
            }
        }
    }

    fn render_variable(&mut self, tag: &Placeholder, scope: &Scope<'_>) {
        match scope.lookup(&tag.name).and_then(to_text) {
            Some(text) => self.push_text(&text),
            None => match self.options.missing {
                MissingValue::Empty => {}
                MissingValue::Error => self
                    .errors
                    .push(TagError::new(self.part, &tag.name, "Undefined value")),
            },
        }
    }

    fn render_section(&mut self, tag: &Placeholder, inverted: bool, body: &[Node], scope: &Scope<'_>) {
        let value = scope.lookup(&tag.name);

        if inverted {
            if !value.is_some_and(is_truthy) {
                self.render_nodes(body, scope);
            }
            return;
        }

        match value {
            Some(Value::Array(items)) => {
                for item in items {
                    self.render_nodes(body, &scope.child(item));
                }
            }
            Some(value) if is_truthy(value) => self.render_nodes(body, &scope.child(value)),
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str) {
        if !self.options.linebreaks {
            self.out.push_str(&partial_escape(text));
            return;
        }

        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                self.out.push_str(LINE_BREAK);
                self.out.push_str(PRESERVED_TEXT_START);
            }
            let line = line.strip_suffix('\r').unwrap_or(line);
            self.out.push_str(&partial_escape(line));
        }
    }
}
