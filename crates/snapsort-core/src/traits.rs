//! Collaborator traits injected into the pipeline.

use async_trait::async_trait;

use crate::Result;

/// Binary payload sent alongside an instruction.
#[derive(Debug, Clone, Copy)]
pub struct Attachment<'a> {
    pub data: &'a [u8],
    pub media_type: &'a str,
}

impl<'a> Attachment<'a> {
    pub fn new(data: &'a [u8], media_type: &'a str) -> Self {
        Self { data, media_type }
    }
}

/// Multimodal inference service.
///
/// Returns free-form text that is expected, but not guaranteed, to contain
/// one JSON object. Callers own the recovery policy.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Submit an instruction with an optional image.
    async fn submit(&self, instruction: &str, attachment: Option<Attachment<'_>>)
        -> Result<String>;

    /// Check if the service is reachable.
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

/// Converts legacy image encodings into JPEG.
#[async_trait]
pub trait ImageTranscoder: Send + Sync {
    /// Transcode `data` (declared as `media_type`) to JPEG bytes.
    async fn to_jpeg(&self, data: &[u8], media_type: &str) -> Result<Vec<u8>>;

    fn name(&self) -> &str;
}
