/*
 * options.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Merge configuration.

/// What to do when a placeholder resolves to nothing (absent field or `null`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingValue {
    /// Substitute an empty string.
    #[default]
    Empty,
    /// Report an "undefined value" tag error.
    Error,
}

/// Options controlling how a template is merged.
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// Repeat whole paragraphs when section tags stand alone in their own paragraphs.
    pub paragraph_loop: bool,

    /// Turn `\n` in substituted values into `<w:br/>` breaks.
    pub linebreaks: bool,

    /// Policy for placeholders with no value.
    pub missing: MissingValue,
}
