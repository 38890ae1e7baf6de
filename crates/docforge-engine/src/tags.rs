/*
 * tags.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Placeholder discovery in run text.
//!
//! Word splits text into runs whenever formatting, spell-check state or
//! revision marks change, so a tag typed as `{name}` can end up stored as
//! `{na` in one `<w:t>` and `me}` in the next. Discovery therefore works on
//! the concatenated text of all `<w:t>` elements of a part, then moves every
//! tag back into the `<w:t>` where it starts.

use crate::error::TagError;
use crate::xml::{PRESERVED_TEXT_START, TEXT_ELEMENT, Token};

/// Opening tag delimiter.
pub const OPEN_DELIMITER: char = '{';

/// Closing tag delimiter.
pub const CLOSE_DELIMITER: char = '}';

/// Longest tag excerpt quoted in delimiter errors.
const SNIPPET_CHARS: usize = 20;

/// The kind of a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    /// `{name}`
    Variable,
    /// `{#name}`
    Section,
    /// `{^name}`
    InvertedSection,
    /// `{/name}`
    Close,
}

/// A placeholder tag found in template text.
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    pub kind: TagKind,
    /// Tag name with the kind prefix and surrounding whitespace removed.
    pub name: String,
    /// Tag text as written, delimiters included.
    pub raw: String,
}

impl Placeholder {
    /// Parse a delimited tag such as `{#items}`.
    ///
    /// Returns `None` if the tag has no name.
    pub fn parse(raw: &str) -> Option<Self> {
        let inner = raw
            .strip_prefix(OPEN_DELIMITER)?
            .strip_suffix(CLOSE_DELIMITER)?
            .trim();

        let (kind, name) = match inner.chars().next()? {
            '#' => (TagKind::Section, &inner[1..]),
            '^' => (TagKind::InvertedSection, &inner[1..]),
            '/' => (TagKind::Close, &inner[1..]),
            _ => (TagKind::Variable, inner),
        };

        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        Some(Self {
            kind,
            name: name.to_string(),
            raw: raw.to_string(),
        })
    }

    /// Whether this tag opens a section.
    pub fn opens_section(&self) -> bool {
        matches!(self.kind, TagKind::Section | TagKind::InvertedSection)
    }
}

/// Replace placeholder text in `<w:t>` tokens with [`Token::Tag`] tokens.
///
/// Delimiter problems are appended to `errors`. Text whose tags could not be
/// read is left as literal text.
pub fn extract_placeholders(
    part: &str,
    mut tokens: Vec<Token>,
    errors: &mut Vec<TagError>,
) -> Vec<Token> {
    let texts: Vec<String> = tokens
        .iter_mut()
        .filter_map(|token| match token {
            Token::Text(text) => Some(std::mem::take(text)),
            _ => None,
        })
        .collect();

    if texts.is_empty() {
        return tokens;
    }

    let joined = texts.concat();
    let spans = find_spans(part, &joined, errors);
    let (mut rebuilt, local_spans) = regroup(&texts, &spans);

    let mut out = Vec::with_capacity(tokens.len());
    let mut segment = 0;

    for token in tokens {
        if !matches!(token, Token::Text(_)) {
            out.push(token);
            continue;
        }

        let text = std::mem::take(&mut rebuilt[segment]);
        let spans = &local_spans[segment];
        let regrouped = text != texts[segment];
        segment += 1;

        // A run that lost part of its text may now start or end with a space
        if regrouped || !spans.is_empty() {
            preserve_space(&mut out);
        }

        if spans.is_empty() {
            out.push(Token::Text(text));
            continue;
        }

        let mut cursor = 0;
        for &(start, end) in spans {
            if start > cursor {
                out.push(Token::Text(text[cursor..start].to_string()));
            }
            let raw = &text[start..end];
            match Placeholder::parse(raw) {
                Some(placeholder) => out.push(Token::Tag(placeholder)),
                None => errors.push(TagError::new(part, raw, "Empty tag")),
            }
            cursor = end;
        }
        if cursor < text.len() {
            out.push(Token::Text(text[cursor..].to_string()));
        }
    }

    out
}

/// Find delimited tags in `text`, as byte ranges including the delimiters.
fn find_spans(part: &str, text: &str, errors: &mut Vec<TagError>) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut open: Option<usize> = None;
    let mut last_boundary = 0;

    for (pos, ch) in text.char_indices() {
        match ch {
            OPEN_DELIMITER => {
                if let Some(start) = open {
                    errors.push(TagError::new(
                        part,
                        head_snippet(&text[start..pos]),
                        "Unclosed tag",
                    ));
                }
                open = Some(pos);
            }
            CLOSE_DELIMITER => match open.take() {
                Some(start) => {
                    spans.push((start, pos + 1));
                    last_boundary = pos + 1;
                }
                None => {
                    errors.push(TagError::new(
                        part,
                        tail_snippet(&text[last_boundary..=pos]),
                        "Unopened tag",
                    ));
                    last_boundary = pos + 1;
                }
            },
            _ => {}
        }
    }

    if let Some(start) = open {
        errors.push(TagError::new(
            part,
            head_snippet(&text[start..]),
            "Unclosed tag",
        ));
    }

    spans
}

/// Move each tag into the text segment where it starts.
///
/// Returns the rebuilt segment texts and, per segment, the tag ranges in
/// local byte offsets.
fn regroup(texts: &[String], spans: &[(usize, usize)]) -> (Vec<String>, Vec<Vec<(usize, usize)>>) {
    let mut rebuilt = vec![String::new(); texts.len()];
    let mut local_spans = vec![Vec::new(); texts.len()];
    let mut pending = spans.iter().peekable();

    // (owner segment, local start, global end) of the tag being moved
    let mut current: Option<(usize, usize, usize)> = None;
    let mut segment_start = 0;

    for (segment, text) in texts.iter().enumerate() {
        for (local, ch) in text.char_indices() {
            let global = segment_start + local;

            if current.is_none() {
                if let Some(&&(start, end)) = pending.peek() {
                    if start == global {
                        pending.next();
                        current = Some((segment, rebuilt[segment].len(), end));
                    }
                }
            }

            let owner = current.map_or(segment, |(owner, _, _)| owner);
            rebuilt[owner].push(ch);

            if let Some((owner, local_start, end)) = current {
                if global + ch.len_utf8() == end {
                    local_spans[owner].push((local_start, rebuilt[owner].len()));
                    current = None;
                }
            }
        }
        segment_start += text.len();
    }

    (rebuilt, local_spans)
}

/// Mark the enclosing `<w:t>` so Word keeps spaces around substituted values.
fn preserve_space(out: &mut [Token]) {
    if let Some(Token::Open { name, raw }) = out.last_mut() {
        if name == TEXT_ELEMENT {
            *raw = PRESERVED_TEXT_START.to_string();
        }
    }
}

fn head_snippet(text: &str) -> String {
    text.trim().chars().take(SNIPPET_CHARS).collect()
}

fn tail_snippet(text: &str) -> String {
    let text = text.trim();
    let skip = text.chars().count().saturating_sub(SNIPPET_CHARS);
    text.chars().skip(skip).collect()
}
