//! Outbound-telemetry scrubber.
//!
//! Unlike the name-based masking in the parent module, this freestanding
//! scrubber pattern-matches the *values* themselves: card-number-like and
//! phone-like digit sequences are masked down to their last four digits and
//! e-mail addresses keep only the first character of the local part. It
//! operates on arbitrary nested structures, never fails, and always returns
//! output with the same shape as its input.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

// 13-19 digits with optional single space/dash separators.
static CARD_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d(?:[ -]?\d){12,18}\b").expect("card pattern compiles")
});

// 10-12 digits with optional separators, optionally led by `+`.
static PHONE_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\+?\b\d(?:[ \-.]?\d){9,11}\b").expect("phone pattern compiles")
});

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
        .expect("email pattern compiles")
});

/// Scrub a nested structure for telemetry. Same-shaped output, no failures.
pub fn scrub_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), scrub_value(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(scrub_value).collect()),
        Value::String(s) => Value::String(scrub_text(s)),
        other => other.clone(),
    }
}

/// Scrub one string value.
///
/// Card-like runs are processed before phone-like ones so a long card
/// number is not half-eaten by the shorter phone pattern.
pub fn scrub_text(text: &str) -> String {
    let pass = CARD_LIKE.replace_all(text, |caps: &regex::Captures<'_>| {
        mask_digits(&caps[0])
    });
    let pass = PHONE_LIKE.replace_all(&pass, |caps: &regex::Captures<'_>| {
        mask_digits(&caps[0])
    });
    EMAIL
        .replace_all(&pass, |caps: &regex::Captures<'_>| mask_email(&caps[0]))
        .into_owned()
}

/// Replace all digits but the last four with `*`, preserving separators.
fn mask_digits(run: &str) -> String {
    let digit_count = run.chars().filter(char::is_ascii_digit).count();
    let mut seen = 0;
    run.chars()
        .map(|c| {
            if c.is_ascii_digit() {
                seen += 1;
                if seen + 4 <= digit_count { '*' } else { c }
            } else {
                c
            }
        })
        .collect()
}

/// Keep the first character of the local part and the full domain.
fn mask_email(address: &str) -> String {
    match address.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{first}***@{domain}")
        }
        None => address.to_string(),
    }
}
