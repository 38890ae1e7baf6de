//! Document assembly
//!
//! Wraps the merge engine with the service's options and converts engine
//! failures into [`ServiceError`] values.

use docforge_engine::{EngineError, MergeOptions, MissingValue, render_document};
use serde_json::Value;
use tracing::info;

use crate::error::{Result, ServiceError, TagFailure};
use crate::resolver::TemplateBytes;

/// A generated `.docx` archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDocument(Vec<u8>);

impl GeneratedDocument {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct DocumentAssembler {
    options: MergeOptions,
}

impl DocumentAssembler {
    pub fn new(options: MergeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    /// Merge `data` into `template`.
    ///
    /// CPU-bound; call from a blocking context.
    pub fn assemble(&self, template: &TemplateBytes, data: &Value) -> Result<GeneratedDocument> {
        let output = render_document(template.as_bytes(), data, &self.options)
            .map_err(ServiceError::from)?;
        info!(
            template_size = template.len(),
            size = output.len(),
            "Document assembled"
        );
        Ok(GeneratedDocument(output))
    }
}

impl Default for DocumentAssembler {
    /// Paragraph loops and line breaks on, missing values render empty.
    fn default() -> Self {
        Self::new(MergeOptions {
            paragraph_loop: true,
            linebreaks: true,
            missing: MissingValue::Empty,
        })
    }
}

impl From<EngineError> for ServiceError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Template { errors } => ServiceError::Merge {
                failures: errors
                    .into_iter()
                    .map(|e| TagFailure {
                        tag: e.tag,
                        message: e.message,
                    })
                    .collect(),
            },
            EngineError::Archive(message) => ServiceError::Archive(message),
            EngineError::Xml { part, message } => {
                ServiceError::Archive(format!("{}: {}", part, message))
            }
        }
    }
}
