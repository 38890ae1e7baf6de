/*
 * xml.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Flat tokenization of WordprocessingML parts.
//!
//! Parts are never built into an element tree. A part is split into a flat
//! token list that keeps every piece of markup byte-for-byte, and only the
//! character data of `<w:t>` elements is decoded, since that is the only
//! place placeholders can live.

use quick_xml::Reader;
use quick_xml::escape::partial_escape;
use quick_xml::events::Event;

use crate::error::{EngineError, EngineResult};
use crate::tags::Placeholder;

/// Element holding run text.
pub const TEXT_ELEMENT: &str = "w:t";

/// Paragraph element.
pub const PARAGRAPH_ELEMENT: &str = "w:p";

/// Table row element.
pub const ROW_ELEMENT: &str = "w:tr";

/// Table cell element.
pub const CELL_ELEMENT: &str = "w:tc";

/// Start tag written for run text that carries substituted values.
pub const PRESERVED_TEXT_START: &str = "<w:t xml:space=\"preserve\">";

/// A token of a tokenized part.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Start tag, kept verbatim.
    Open { name: String, raw: String },

    /// End tag, kept verbatim.
    Close { name: String, raw: String },

    /// Markup that does not change nesting depth: empty elements, the XML
    /// declaration, comments, processing instructions and character data
    /// outside `<w:t>`.
    Markup(String),

    /// Decoded character data of a `<w:t>` element.
    Text(String),

    /// A placeholder found inside `<w:t>` text.
    Tag(Placeholder),
}

impl Token {
    /// Element name for start and end tags.
    pub fn element_name(&self) -> Option<&str> {
        match self {
            Token::Open { name, .. } | Token::Close { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Write this token back out as XML.
    ///
    /// Placeholders produce nothing; the evaluator replaces them before
    /// anything is written.
    pub fn write_to(&self, out: &mut String) {
        match self {
            Token::Open { raw, .. } | Token::Close { raw, .. } | Token::Markup(raw) => {
                out.push_str(raw)
            }
            Token::Text(text) => out.push_str(&partial_escape(text.as_str())),
            Token::Tag(_) => {}
        }
    }
}

/// Split a part into tokens.
///
/// # Errors
///
/// Returns [`EngineError::Xml`] if the part is not well-formed.
pub fn tokenize(part: &str, content: &str) -> EngineResult<Vec<Token>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text_start = false;
    reader.config_mut().trim_text_end = false;

    let xml_error = |message: String| EngineError::Xml {
        part: part.to_string(),
        message,
    };

    let mut tokens = Vec::new();
    let mut open_elements: Vec<String> = Vec::new();

    loop {
        let start = reader.buffer_position() as usize;
        let event = reader
            .read_event()
            .map_err(|e| xml_error(format!("{} at byte {}", e, reader.error_position())))?;
        let end = reader.buffer_position() as usize;
        let raw = &content[start..end];

        match event {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                open_elements.push(name.clone());
                tokens.push(Token::Open {
                    name,
                    raw: raw.to_string(),
                });
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                open_elements.pop();
                tokens.push(Token::Close {
                    name,
                    raw: raw.to_string(),
                });
            }
            Event::Text(e) if open_elements.last().is_some_and(|n| n == TEXT_ELEMENT) => {
                let text = e
                    .unescape()
                    .map_err(|err| xml_error(format!("{} in run text", err)))?;
                tokens.push(Token::Text(text.into_owned()));
            }
            Event::Eof => break,
            _ => tokens.push(Token::Markup(raw.to_string())),
        }
    }

    if let Some(unclosed) = open_elements.last() {
        return Err(xml_error(format!(
            "unexpected end of input, <{}> is not closed",
            unclosed
        )));
    }

    Ok(tokens)
}

/// Write a token list back out as XML.
pub fn write_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        token.write_to(&mut out);
    }
    out
}
