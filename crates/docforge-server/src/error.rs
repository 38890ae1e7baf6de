//! Error types for docforge-server

use std::path::PathBuf;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{error, warn};

/// One failed placeholder, as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagFailure {
    pub tag: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{message}")]
    Validation { title: &'static str, message: String },

    #[error("Template not found: {file_name}")]
    TemplateNotFound { file_name: String, tried: Vec<PathBuf> },

    #[error("The requested endpoint does not exist")]
    RouteNotFound,

    #[error("Template processing error: {}", join_failures(.failures))]
    Merge { failures: Vec<TagFailure> },

    #[error("Invalid template archive: {0}")]
    Archive(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unexpected error: {0}")]
    Unclassified(String),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

fn join_failures(failures: &[TagFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} (tag: {})", f.message, f.tag))
        .collect::<Vec<_>>()
        .join(", ")
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<TagFailure>>,
}

impl ServiceError {
    pub fn missing_user_data() -> Self {
        ServiceError::Validation {
            title: "Missing userData",
            message: "Missing userData in request body".to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation { .. } => StatusCode::BAD_REQUEST,
            ServiceError::TemplateNotFound { .. } | ServiceError::RouteNotFound => {
                StatusCode::NOT_FOUND
            }
            ServiceError::Merge { .. }
            | ServiceError::Archive(_)
            | ServiceError::Io(_)
            | ServiceError::Server(_)
            | ServiceError::Config(_)
            | ServiceError::Unclassified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            ServiceError::Validation { title, .. } => title,
            ServiceError::TemplateNotFound { .. } => "Template not found",
            ServiceError::RouteNotFound => "Not Found",
            _ => "Error generating resume",
        }
    }

    /// Message shown to clients. Internal failures get a generic text.
    fn public_message(&self) -> String {
        match self {
            ServiceError::Io(_)
            | ServiceError::Server(_)
            | ServiceError::Config(_)
            | ServiceError::Unclassified(_) => {
                "An unexpected error occurred".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let body = ErrorBody {
            error: self.title(),
            message: self.public_message(),
            details: match &self {
                ServiceError::Merge { failures } => Some(failures.clone()),
                _ => None,
            },
        };
        (status, Json(body)).into_response()
    }
}
