//! Plaintext configuration bundle: flat `KEY=VALUE` lines.
//!
//! Comments beginning with `#` and blank lines are ignored; values may be
//! single- or double-quoted, with the quotes stripped on parse. Insertion
//! order is preserved so a parse/render cycle keeps the operator's layout.

use indexmap::IndexMap;

use crate::core::BundleError;
use crate::masking;

/// Parsed `KEY=VALUE` configuration bundle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigBundle {
    entries: IndexMap<String, String>,
}

impl ConfigBundle {
    /// Empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the flat text format. A non-comment line without `=` is an
    /// error; everything else is forgiving.
    pub fn parse(text: &str) -> Result<Self, BundleError> {
        let mut entries = IndexMap::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(BundleError::MalformedLine {
                    line: idx + 1,
                    content: line.to_string(),
                });
            };

            entries.insert(
                key.trim().to_string(),
                strip_quotes(value.trim()).to_string(),
            );
        }

        Ok(Self { entries })
    }

    /// Render back to the flat text format. Values containing whitespace or
    /// `#` are double-quoted so they survive a re-parse.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            if value.contains(char::is_whitespace) || value.contains('#') {
                out.push_str(&format!("{key}=\"{value}\"\n"));
            } else {
                out.push_str(&format!("{key}={value}\n"));
            }
        }
        out
    }

    /// Look up a value by name.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Insert or replace a value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bundle has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Display rows with sensitive values redacted. This is the only form
    /// in which bundle contents may reach a log line or a terminal.
    pub fn masked_entries(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), masking::mask_value(k, v).into_owned()))
            .collect()
    }
}

fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_comments_blanks_and_quotes() {
        let text = "\
# Deployment configuration
DB_HOST=localhost

DB_PASSWORD='hunter2'
APP_NAME=\"My App\"
  DEBUG = True
";
        let bundle = ConfigBundle::parse(text).unwrap();
        assert_eq!(bundle.len(), 4);
        assert_eq!(bundle.get("DB_HOST"), Some("localhost"));
        assert_eq!(bundle.get("DB_PASSWORD"), Some("hunter2"));
        assert_eq!(bundle.get("APP_NAME"), Some("My App"));
        assert_eq!(bundle.get("DEBUG"), Some("True"));
    }

    #[test]
    fn value_may_contain_equals() {
        let bundle = ConfigBundle::parse("CONN=host=db;port=5432\n").unwrap();
        assert_eq!(bundle.get("CONN"), Some("host=db;port=5432"));
    }

    #[test]
    fn malformed_line_reports_position() {
        let err = ConfigBundle::parse("A=1\nnot a pair\n").unwrap_err();
        let BundleError::MalformedLine { line, content } = err;
        assert_eq!(line, 2);
        assert_eq!(content, "not a pair");
    }

    #[test]
    fn mismatched_quotes_are_kept_verbatim() {
        let bundle = ConfigBundle::parse("K='half\n").unwrap();
        assert_eq!(bundle.get("K"), Some("'half"));
    }

    #[test]
    fn render_parse_roundtrip_preserves_order() {
        let mut bundle = ConfigBundle::new();
        bundle.set("Z_LAST", "26");
        bundle.set("A_FIRST", "1");
        bundle.set("GREETING", "hello world");

        let rendered = bundle.render();
        let reparsed = ConfigBundle::parse(&rendered).unwrap();
        assert_eq!(reparsed, bundle);

        let keys: Vec<_> = reparsed.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["Z_LAST", "A_FIRST", "GREETING"]);
    }

    #[test]
    fn masked_entries_redact_sensitive_names() {
        let bundle =
            ConfigBundle::parse("DB_PASSWORD=a-very-long-secret-value\nDEBUG=True\n").unwrap();
        let rows = bundle.masked_entries();
        assert_eq!(rows[0], ("DB_PASSWORD".to_string(), "a-ve...alue".to_string()));
        assert_eq!(rows[1], ("DEBUG".to_string(), "True".to_string()));
    }
}
