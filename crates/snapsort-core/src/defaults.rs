//! Centralized default constants for snapsort.
//!
//! **This module is the single source of truth** for all shared default values.
//! Crates reference these constants instead of defining their own magic numbers.
//!
//! Organized by domain area. When adding new constants, place them in the
//! appropriate section.

// =============================================================================
// BATCH LIMITS
// =============================================================================

/// Maximum number of images accepted in one analyze request.
pub const MAX_BATCH_SIZE: usize = 10;

/// Maximum characters kept in an extracted text snippet.
pub const EXTRACTED_TEXT_MAX_CHARS: usize = 150;

/// Confidence used when the model returns a missing or non-numeric value.
pub const DEFAULT_CONFIDENCE: u8 = 50;

/// Upper bound for confidence values.
pub const MAX_CONFIDENCE: u8 = 100;

// =============================================================================
// FALLBACK RECORDS
// =============================================================================

/// Theme assigned when a record has no usable theme.
pub const FALLBACK_THEME: &str = "misc";

/// Extracted text for a response that could not be parsed.
pub const UNPARSED_TEXT: &str = "Could not extract text";

/// Confidence for a response that could not be parsed.
pub const UNPARSED_CONFIDENCE: u8 = 20;

/// Extracted text for an item whose inference call failed.
pub const FAILED_TEXT: &str = "Processing failed";

/// Error message attached to results whose response could not be parsed.
pub const UNPARSED_ERROR_MESSAGE: &str = "Could not parse analysis response";

/// Reserved category for indices no synthesized category claimed.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Description of the reserved category.
pub const UNCATEGORIZED_DESCRIPTION: &str = "Images that could not be categorized";

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server host.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default request body limit (50 MiB covers ten large photos as base64).
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Default CORS origins when ALLOWED_ORIGINS is unset.
pub const ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

// =============================================================================
// INFERENCE
// =============================================================================

/// Environment variable selecting the inference provider.
pub const ENV_INFERENCE_PROVIDER: &str = "INFERENCE_PROVIDER";

/// Default Ollama endpoint.
pub const OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Environment variable naming the Ollama vision model.
pub const ENV_OLLAMA_VISION_MODEL: &str = "OLLAMA_VISION_MODEL";

/// Default Ollama vision model.
pub const DEFAULT_OLLAMA_VISION_MODEL: &str = "qwen3-vl:8b";

/// Default OpenAI-compatible endpoint.
pub const OPENAI_URL: &str = "https://api.openai.com/v1";

/// Default OpenAI-compatible vision model.
pub const DEFAULT_OPENAI_VISION_MODEL: &str = "gpt-4o-mini";

/// Timeout for a single vision request (seconds).
pub const VISION_TIMEOUT_SECS: u64 = 120;

/// Timeout for health probes (seconds).
pub const HEALTH_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// TRANSCODING
// =============================================================================

/// Default external command used to convert HEIC images to JPEG.
pub const HEIC_CONVERT_CMD: &str = "heif-convert";

/// Timeout for the HEIC conversion command (seconds).
pub const HEIC_CONVERT_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// EXPORT
// =============================================================================

/// Name of the plain-text report placed at the archive root.
pub const SUMMARY_FILE_NAME: &str = "summary.txt";

/// Date format used in archived filenames.
pub const EXPORT_DATE_FORMAT: &str = "%Y-%m-%d";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_confidences_in_range() {
        assert!(UNPARSED_CONFIDENCE <= MAX_CONFIDENCE);
        assert!(DEFAULT_CONFIDENCE <= MAX_CONFIDENCE);
    }

    #[test]
    fn test_reserved_names_are_category_keys() {
        assert_eq!(UNCATEGORIZED, UNCATEGORIZED.to_lowercase());
        assert_eq!(FALLBACK_THEME, FALLBACK_THEME.to_lowercase());
    }
}
