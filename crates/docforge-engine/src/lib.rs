/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Placeholder merge engine for WordprocessingML (`.docx`) templates.
//!
//! A `.docx` file is a ZIP archive of XML parts. This crate opens the archive,
//! finds placeholder tags in the text of the document, header, footer and
//! note parts, substitutes values from a JSON object, and writes the archive
//! back out with deterministic DEFLATE compression.
//!
//! The tag syntax is a docxtemplater-compatible subset:
//!
//! - Substitution: `{name}`, nested fields `{address.city}`, current item `{.}`
//! - Sections: `{#items}...{/items}` iterate lists, render objects and other
//!   truthy values once, and render nothing for falsy values
//! - Inverted sections: `{^items}...{/items}` render once when the value is falsy
//!
//! Word processors often split a tag over several runs (`<w:r>`) when the
//! user edits it. Tags are re-assembled into the run where they start before
//! any substitution happens.
//!
//! # Example
//!
//! ```ignore
//! use docforge_engine::{MergeOptions, render_document};
//!
//! let template = std::fs::read("templates/default-resume.docx")?;
//! let data = serde_json::json!({ "name": "Ada Lovelace" });
//! let docx = render_document(&template, &data, &MergeOptions::default())?;
//! ```

pub mod error;
pub mod evaluator;
pub mod options;
pub mod package;
pub mod parser;
pub mod tags;
pub mod value;
pub mod xml;

pub use error::{EngineError, EngineResult, TagError};
pub use options::{MergeOptions, MissingValue};
pub use package::{
    DOCUMENT_PART, build_package, package_with_document, read_entry, render_document,
    sample_document,
};
pub use tags::{Placeholder, TagKind};
