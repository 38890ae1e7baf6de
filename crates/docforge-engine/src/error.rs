/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for merging templates.

use std::fmt;

use thiserror::Error;

/// A failure attached to one placeholder tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagError {
    /// Archive entry the tag was found in (e.g. `word/document.xml`).
    pub part: String,
    /// Tag identifier: the tag name, or the raw tag text when no name could be read.
    pub tag: String,
    /// Human-readable description of the failure.
    pub message: String,
}

impl TagError {
    pub fn new(part: &str, tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            part: part.to_string(),
            tag: tag.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for TagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (tag: {})", self.message, self.tag)
    }
}

/// Errors that can occur while merging data into a template.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The template is not a readable ZIP archive.
    #[error("Archive error: {0}")]
    Archive(String),

    /// A templated part is not well-formed XML or not UTF-8.
    #[error("XML error in {part}: {message}")]
    Xml { part: String, message: String },

    /// One or more tags could not be processed.
    #[error("Template processing error: {}", join_tag_errors(.errors))]
    Template { errors: Vec<TagError> },
}

impl From<zip::result::ZipError> for EngineError {
    fn from(err: zip::result::ZipError) -> Self {
        EngineError::Archive(err.to_string())
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

fn join_tag_errors(errors: &[TagError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
