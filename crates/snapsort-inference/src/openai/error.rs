//! Classification of failed chat-completion calls.
//!
//! Vision requests fail in ways text requests do not: the attached image
//! may be too large or in a format the provider cannot decode, and the
//! configured model may not accept images at all. The first is a per-item
//! problem; the second is a deployment problem and is reported as a
//! configuration error.

use snapsort_core::Error;

use super::types::OpenAIError;

/// Why a chat-completion call was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisionFailure {
    Unauthorized,
    RateLimited,
    UnknownModel,
    /// The model does not take image input.
    NoVisionSupport,
    /// The provider could not accept this particular image.
    ImageRejected,
    /// Prompt plus image exceeded the model's context window.
    ContextTooLong,
    Upstream,
    Other,
}

const IMAGE_MARKERS: &[&str] = &["image", "media_type", "mime"];
const NO_VISION_MARKERS: &[&str] = &[
    "does not support image",
    "doesn't support image",
    "not a multimodal",
    "image input is not supported",
    "no endpoints found that support image",
];

impl VisionFailure {
    /// Classify a refusal from its HTTP status and error body.
    ///
    /// Image-specific classes are only considered when an image was sent.
    pub fn classify(status: u16, detail: &OpenAIError, image_attached: bool) -> Self {
        let text = format!(
            "{} {} {}",
            detail.error_type,
            detail.code.as_deref().unwrap_or_default(),
            detail.message
        )
        .to_lowercase();
        let mentions = |markers: &[&str]| markers.iter().any(|m| text.contains(m));

        if image_attached && mentions(NO_VISION_MARKERS) {
            return Self::NoVisionSupport;
        }
        match status {
            401 | 403 if !text.contains("quota") => Self::Unauthorized,
            429 => Self::RateLimited,
            _ if text.contains("insufficient_quota") => Self::RateLimited,
            404 => Self::UnknownModel,
            _ if text.contains("model_not_found") => Self::UnknownModel,
            413 if image_attached => Self::ImageRejected,
            400 | 422 if text.contains("context_length") => Self::ContextTooLong,
            400 | 415 | 422 if image_attached && mentions(IMAGE_MARKERS) => Self::ImageRejected,
            413 => Self::ContextTooLong,
            500..=599 => Self::Upstream,
            _ => Self::Other,
        }
    }

    /// Convert into the crate error, prefixing `message` with the class.
    pub fn into_error(self, message: &str) -> Error {
        match self {
            Self::Unauthorized => Error::Config(format!("Authentication failed: {}", message)),
            Self::UnknownModel => Error::Config(format!("Model not found: {}", message)),
            Self::NoVisionSupport => {
                Error::Config(format!("Model does not accept images: {}", message))
            }
            Self::RateLimited => Error::Inference(format!("Rate limit exceeded: {}", message)),
            Self::ImageRejected => Error::Inference(format!("Image rejected: {}", message)),
            Self::ContextTooLong => Error::Inference(format!("Request too large: {}", message)),
            Self::Upstream => Error::Inference(format!("Server error: {}", message)),
            Self::Other => Error::Inference(message.to_string()),
        }
    }
}
