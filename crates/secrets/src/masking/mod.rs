//! Redaction of sensitive configuration values for display and logging.
//!
//! Classification is by field *name*: a static, process-wide set of
//! case-insensitive substrings marks a name as sensitive. Masking is
//! deterministic and never shows more than 8 characters of a sensitive
//! value, regardless of its length.

pub mod scrub;

use std::borrow::Cow;

use serde_json::Value;

/// Case-insensitive substrings that mark a field name as sensitive.
///
/// Process-wide static configuration, not mutable state.
pub const SENSITIVE_MARKERS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "token",
    "key",
    "auth",
    "cookie",
    "credit_card",
    "private",
    "credential",
];

/// Fixed marker substituted for short sensitive values.
const REDACTED: &str = "***";

/// Number of characters kept at each end of a long sensitive value.
const VISIBLE_EDGE: usize = 4;

/// True if the field name contains any sensitive marker, case-insensitively.
pub fn is_sensitive(field_name: &str) -> bool {
    let lower = field_name.to_ascii_lowercase();
    SENSITIVE_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Redact a value according to its field name.
///
/// Non-sensitive names pass the value through unchanged. Sensitive values of
/// 8 characters or fewer collapse to the fixed `***` marker; longer ones keep
/// the first and last 4 characters around an ellipsis.
pub fn mask_value<'a>(field_name: &str, value: &'a str) -> Cow<'a, str> {
    if is_sensitive(field_name) {
        Cow::Owned(redact(value))
    } else {
        Cow::Borrowed(value)
    }
}

fn redact(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 2 * VISIBLE_EDGE {
        return REDACTED.to_string();
    }
    let head: String = chars[..VISIBLE_EDGE].iter().collect();
    let tail: String = chars[chars.len() - VISIBLE_EDGE..].iter().collect();
    format!("{head}...{tail}")
}

/// Recursively mask a nested structure.
///
/// Maps are walked with their keys as field names; sequences inherit the
/// nearest enclosing key. String leaves under a sensitive key get the
/// [`mask_value`] rules; non-string leaves under a sensitive key are fully
/// redacted; everything else is returned untouched.
pub fn mask_structure(value: &Value) -> Value {
    mask_node(None, value)
}

fn mask_node(key: Option<&str>, value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), mask_node(Some(k), v)))
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| mask_node(key, v)).collect())
        }
        Value::String(s) => match key {
            Some(k) if is_sensitive(k) => Value::String(redact(s)),
            _ => value.clone(),
        },
        other => match key {
            Some(k) if is_sensitive(k) => Value::String(REDACTED.to_string()),
            _ => other.clone(),
        },
    }
}
