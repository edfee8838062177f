//! Structured output recovery for free-form model responses.
//!
//! Vision models are asked for a single JSON object but routinely wrap it
//! in prose or markdown fences. [`parse_structured`] applies the recovery
//! steps in order and reports a [`ParseError`] when none succeeds; building
//! a fallback value is the caller's job.

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Why a model response could not be turned into a structured value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Response is empty")]
    Empty,

    #[error("No JSON object found in response")]
    NoObject,

    #[error("Invalid JSON object: {0}")]
    Invalid(String),
}

/// Parse `raw` as `T`, recovering from surrounding noise.
///
/// 1. Parse the trimmed text directly.
/// 2. Parse the span from the first `{` to the last `}`.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let direct_err = match serde_json::from_str::<T>(trimmed) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let Some(candidate) = extract_braced(trimmed) else {
        return Err(ParseError::NoObject);
    };

    if candidate.len() == trimmed.len() {
        // The braced span is the whole response; the direct attempt already failed on it.
        return Err(ParseError::Invalid(direct_err.to_string()));
    }

    serde_json::from_str::<T>(candidate).map_err(|e| ParseError::Invalid(e.to_string()))
}

/// Slice from the first `{` through the last `}`, if both exist in order.
pub fn extract_braced(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
