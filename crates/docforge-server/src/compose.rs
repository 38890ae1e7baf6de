//! Binary `.docx` responses

use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::assembler::GeneratedDocument;
use crate::error::{Result, ServiceError};

pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Name used when the data carries no usable `name` field.
pub const FALLBACK_NAME: &str = "document";

/// `name` field of `data`, reduced to `[A-Za-z0-9_-]`.
pub fn safe_name(data: &Value) -> String {
    let cleaned: String = data
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();

    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned
    }
}

/// UTC ISO-8601 instant with `:` and `.` replaced by `-`.
pub fn file_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
}

pub fn generated_filename(data: &Value, now: DateTime<Utc>) -> String {
    format!("resume-{}-{}.docx", safe_name(data), file_timestamp(now))
}

/// Attachment response carrying `bytes`.
pub fn docx_response(bytes: Vec<u8>, filename: &str) -> Result<Response> {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(|e| ServiceError::Unclassified(format!("invalid file name header: {}", e)))?;

    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static(DOCX_CONTENT_TYPE)),
        (header::CONTENT_DISPOSITION, disposition),
        (header::CONTENT_LENGTH, HeaderValue::from(bytes.len())),
        (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
    ];
    Ok((StatusCode::OK, headers, bytes).into_response())
}

/// Response for a generated document, named after the request data.
pub fn compose(document: GeneratedDocument, data: &Value, now: DateTime<Utc>) -> Result<Response> {
    let filename = generated_filename(data, now);
    tracing::info!(%filename, size = document.len(), "Sending document");
    docx_response(document.into_bytes(), &filename)
}
