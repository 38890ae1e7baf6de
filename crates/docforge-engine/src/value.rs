/*
 * value.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Value lookup and conversion rules for merge data.
//!
//! Merge data is plain `serde_json::Value`. Sections push a new [`Scope`]
//! for each iteration; lookups walk from the innermost scope outwards, so a
//! loop body can still reach top-level fields.

use serde_json::Value;

/// A lexical scope used while rendering.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    value: &'a Value,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    /// Create the root scope for a data object.
    pub fn root(value: &'a Value) -> Self {
        Self {
            value,
            parent: None,
        }
    }

    /// Create a nested scope whose current value is `value`.
    pub fn child(&'a self, value: &'a Value) -> Scope<'a> {
        Scope {
            value,
            parent: Some(self),
        }
    }

    /// Resolve a tag name against this scope chain.
    ///
    /// `.` is the current value. Dotted names (`address.city`) resolve their
    /// first segment through the scope chain and the remaining segments
    /// inside the value found there.
    pub fn lookup(&self, name: &str) -> Option<&'a Value> {
        if name == "." {
            return Some(self.value);
        }

        let mut segments = name.split('.');
        let first = segments.next()?;

        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(found) = current.value.get(first) {
                return segments.try_fold(found, |value, segment| value.get(segment));
            }
            scope = current.parent;
        }
        None
    }
}

/// Check if a value is "truthy" for section evaluation.
///
/// - `null`, `false`, `0`, `""` and `[]` are falsy
/// - every object is truthy, even an empty one
/// - everything else is truthy
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

/// Convert a value to substitution text.
///
/// Returns `None` for `null` and objects, which are handled by the
/// missing-value policy.
pub fn to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Object(_) => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| to_text(item).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(","),
        ),
    }
}
