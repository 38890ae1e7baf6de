/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Section structure of a tokenized part.
//!
//! Sections are matched on the flat token list and then expanded to the
//! smallest XML range that can be repeated without breaking the document:
//!
//! - a table row, when the opening and closing tags sit in different cells
//!   of the same row;
//! - whole paragraphs, when paragraph loops are enabled and each tag stands
//!   alone in its own paragraph;
//! - otherwise the tokens between the two tags, which is only valid when
//!   both tags are at the same level of the document.

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

use crate::error::{EngineError, EngineResult, TagError};
use crate::options::MergeOptions;
use crate::tags::{Placeholder, TagKind, extract_placeholders};
use crate::xml::{CELL_ELEMENT, PARAGRAPH_ELEMENT, ROW_ELEMENT, Token, tokenize};

/// A node of a parsed part.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Markup or literal run text, written as-is.
    Token(Token),

    /// `{name}`
    Variable(Placeholder),

    /// `{#name}...{/name}` or `{^name}...{/name}`
    Section {
        tag: Placeholder,
        inverted: bool,
        body: Vec<Node>,
    },
}

/// Parse one XML part into nodes.
///
/// # Errors
///
/// Returns [`EngineError::Xml`] for malformed XML and
/// [`EngineError::Template`] with every tag problem found in the part.
pub fn parse_part(part: &str, content: &str, options: &MergeOptions) -> EngineResult<Vec<Node>> {
    let tokens = tokenize(part, content)?;

    let mut errors = Vec::new();
    let tokens = extract_placeholders(part, tokens, &mut errors);

    let structure = Structure::new(&tokens);
    let mut expansions: BTreeMap<usize, Expansion> = BTreeMap::new();

    for (open, close) in match_sections(part, &tokens, &mut errors) {
        let Some(expansion) = structure.expand(part, open, close, options, &mut errors) else {
            continue;
        };
        if expansions.contains_key(&expansion.start) {
            errors.push(TagError::new(
                part,
                structure.tag_name(open),
                "Several sections expand to the same element",
            ));
            continue;
        }
        expansions.insert(expansion.start, expansion);
    }

    let nodes = structure.build(0..tokens.len(), &expansions, None, part, &mut errors);

    if errors.is_empty() {
        Ok(nodes)
    } else {
        Err(EngineError::Template { errors })
    }
}

/// Pair opening and closing section tags.
fn match_sections(part: &str, tokens: &[Token], errors: &mut Vec<TagError>) -> Vec<(usize, usize)> {
    let mut open_sections: Vec<(usize, &Placeholder)> = Vec::new();
    let mut pairs = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        let Token::Tag(tag) = token else {
            continue;
        };
        match tag.kind {
            TagKind::Section | TagKind::InvertedSection => open_sections.push((i, tag)),
            TagKind::Close => match open_sections.pop() {
                Some((open, opening)) if opening.name == tag.name => pairs.push((open, i)),
                Some((_, opening)) => errors.push(TagError::new(
                    part,
                    &tag.name,
                    format!("Closing tag does not match opening tag {}", opening.raw),
                )),
                None => errors.push(TagError::new(part, &tag.name, "Unopened section")),
            },
            TagKind::Variable => {}
        }
    }

    for (_, opening) in open_sections {
        errors.push(TagError::new(part, &opening.name, "Unclosed section"));
    }

    pairs
}

/// The token range a section repeats.
#[derive(Debug, Clone)]
struct Expansion {
    /// First token replaced by the section.
    start: usize,
    /// Last token replaced by the section (inclusive).
    end: usize,
    /// Tokens rendered once per iteration.
    body: Range<usize>,
    /// Index of the opening tag.
    open: usize,
}

/// Element nesting of a token list.
struct Structure<'a> {
    tokens: &'a [Token],
    /// Innermost enclosing start tag of every token.
    parent: Vec<Option<usize>>,
    /// Start tag index → end tag index.
    closing: HashMap<usize, usize>,
}

impl<'a> Structure<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        let mut parent = Vec::with_capacity(tokens.len());
        let mut closing = HashMap::new();
        let mut stack: Vec<usize> = Vec::new();

        for (i, token) in tokens.iter().enumerate() {
            match token {
                Token::Open { .. } => {
                    parent.push(stack.last().copied());
                    stack.push(i);
                }
                Token::Close { .. } => {
                    let open = stack.pop();
                    parent.push(stack.last().copied());
                    if let Some(open) = open {
                        closing.insert(open, i);
                    }
                }
                _ => parent.push(stack.last().copied()),
            }
        }

        Self {
            tokens,
            parent,
            closing,
        }
    }

    fn ancestors(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.parent[index], move |&p| self.parent[p])
    }

    fn nearest(&self, index: usize, element: &str) -> Option<usize> {
        self.ancestors(index)
            .find(|&a| self.tokens[a].element_name() == Some(element))
    }

    /// Element names from the innermost ancestor outwards.
    fn path(&self, index: usize) -> Vec<&str> {
        self.ancestors(index)
            .filter_map(|a| self.tokens[a].element_name())
            .collect()
    }

    fn end_of(&self, open: usize) -> usize {
        self.closing.get(&open).copied().unwrap_or(open)
    }

    fn tag_name(&self, index: usize) -> &str {
        match &self.tokens[index] {
            Token::Tag(tag) => &tag.name,
            _ => "",
        }
    }

    /// Whether `tag` is the only content of `paragraph`.
    fn stands_alone(&self, paragraph: usize, tag: usize) -> bool {
        (paragraph + 1..self.end_of(paragraph)).all(|i| match &self.tokens[i] {
            Token::Text(text) => text.trim().is_empty(),
            Token::Tag(_) => i == tag,
            _ => true,
        })
    }

    fn expand(
        &self,
        part: &str,
        open: usize,
        close: usize,
        options: &MergeOptions,
        errors: &mut Vec<TagError>,
    ) -> Option<Expansion> {
        let open_cell = self.nearest(open, CELL_ELEMENT);
        let close_cell = self.nearest(close, CELL_ELEMENT);
        if let (Some(open_cell), Some(close_cell)) = (open_cell, close_cell) {
            let row = self.nearest(open_cell, ROW_ELEMENT);
            if open_cell != close_cell && row.is_some() && row == self.nearest(close_cell, ROW_ELEMENT) {
                let row = row?;
                let end = self.end_of(row);
                return Some(Expansion {
                    start: row,
                    end,
                    body: row..end + 1,
                    open,
                });
            }
        }

        if options.paragraph_loop {
            let open_para = self.nearest(open, PARAGRAPH_ELEMENT);
            let close_para = self.nearest(close, PARAGRAPH_ELEMENT);
            if let (Some(open_para), Some(close_para)) = (open_para, close_para) {
                if open_para != close_para
                    && self.stands_alone(open_para, open)
                    && self.stands_alone(close_para, close)
                    && self.path(open_para) == self.path(close_para)
                {
                    return Some(Expansion {
                        start: open_para,
                        end: self.end_of(close_para),
                        body: self.end_of(open_para) + 1..close_para,
                        open,
                    });
                }
            }
        }

        if self.path(open) == self.path(close) {
            return Some(Expansion {
                start: open,
                end: close,
                body: open + 1..close,
                open,
            });
        }

        errors.push(TagError::new(
            part,
            self.tag_name(open),
            "Unbalanced section: opening and closing tags are at different levels of the document",
        ));
        None
    }

    /// Build nodes for `range`.
    ///
    /// `current` is the start of the expansion whose body is being built;
    /// row expansions include their own start token in the body.
    fn build(
        &self,
        range: Range<usize>,
        expansions: &BTreeMap<usize, Expansion>,
        current: Option<usize>,
        part: &str,
        errors: &mut Vec<TagError>,
    ) -> Vec<Node> {
        let mut nodes = Vec::new();
        let mut i = range.start;

        while i < range.end {
            let expansion = expansions
                .get(&i)
                .filter(|_| !(i == range.start && current == Some(i)));

            if let Some(expansion) = expansion {
                if expansion.end < range.end {
                    if let Token::Tag(tag) = &self.tokens[expansion.open] {
                        let body = self.build(
                            expansion.body.clone(),
                            expansions,
                            Some(expansion.start),
                            part,
                            errors,
                        );
                        nodes.push(Node::Section {
                            inverted: tag.kind == TagKind::InvertedSection,
                            tag: tag.clone(),
                            body,
                        });
                    }
                    i = expansion.end + 1;
                    continue;
                }
                errors.push(TagError::new(
                    part,
                    self.tag_name(expansion.open),
                    "Section overlaps the boundary of an enclosing section",
                ));
            }

            match &self.tokens[i] {
                Token::Tag(tag) if tag.kind == TagKind::Variable => {
                    nodes.push(Node::Variable(tag.clone()))
                }
                // Section tags are consumed by their expansion
                Token::Tag(_) => {}
                token => nodes.push(Node::Token(token.clone())),
            }
            i += 1;
        }

        nodes
    }
}
