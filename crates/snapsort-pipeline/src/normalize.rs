//! Post-processing for model-produced fields.

use serde_json::Value;

use snapsort_core::defaults::{
    DEFAULT_CONFIDENCE, EXTRACTED_TEXT_MAX_CHARS, FALLBACK_THEME, MAX_CONFIDENCE,
};

/// Filename-safe slug.
///
/// Whitespace runs become a single `_`; anything outside
/// `[A-Za-z0-9_-]` is dropped. May return an empty string.
pub fn slugify(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Lowercase slug used for themes and category names; never empty.
pub fn category_key(raw: &str) -> String {
    let key = slugify(raw).to_lowercase();
    if key.is_empty() {
        FALLBACK_THEME.to_string()
    } else {
        key
    }
}

/// Trim and cap extracted text at 150 characters.
pub fn truncate_text(raw: &str) -> String {
    raw.trim().chars().take(EXTRACTED_TEXT_MAX_CHARS).collect()
}

/// Integer confidence in [0, 100].
///
/// Numbers and numeric strings are rounded then clamped; anything else
/// yields the default of 50.
pub fn clamp_confidence(value: &Value) -> u8 {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };

    match number {
        Some(n) if n.is_finite() => n.round().clamp(0.0, f64::from(MAX_CONFIDENCE)) as u8,
        _ => DEFAULT_CONFIDENCE,
    }
}

/// Render a scalar JSON value as text; arrays, objects and null become "".
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}
