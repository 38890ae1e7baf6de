//! Redaction of request payloads for logging

use serde_json::Value;

/// Longest string, in characters, that is logged unchanged.
pub const MAX_LOGGED_CHARS: usize = 100;

const TRUNCATION_MARKER: &str = "...";

/// Copy of `data` with long strings truncated, for log output only.
pub fn redact_for_logging(data: &Value) -> Value {
    match data {
        Value::String(s) => Value::String(truncate(s)),
        Value::Array(items) => Value::Array(items.iter().map(redact_for_logging).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), redact_for_logging(value)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn truncate(s: &str) -> String {
    match s.char_indices().nth(MAX_LOGGED_CHARS) {
        Some((end, _)) => format!("{}{}", &s[..end], TRUNCATION_MARKER),
        None => s.to_string(),
    }
}
