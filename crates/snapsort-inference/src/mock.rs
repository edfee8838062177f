//! Mock inference client for deterministic testing.
//!
//! Replies are resolved by the first matching rule, in registration order,
//! falling back to the default reply. Every call is logged so tests can
//! assert on what was (or was not) sent.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use snapsort_inference::mock::MockInferenceClient;
//!
//! let client = MockInferenceClient::new()
//!     .with_fixed_response(r#"{"content": "cat_photo", "theme": "animals"}"#)
//!     .fail_for_image(b"broken".to_vec(), "quota exceeded")
//!     .respond_without_image(r#"{"animals": {"description": "Pets", "images": [0]}}"#);
//! assert_eq!(client.call_count(), 0);
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use snapsort_core::{Attachment, Error, InferenceClient, Result};

/// Mock inference client for testing.
#[derive(Clone)]
pub struct MockInferenceClient {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

#[derive(Debug, Clone)]
struct MockConfig {
    rules: Vec<MockRule>,
    default_reply: MockReply,
    model: String,
    latency_ms: u64,
    healthy: bool,
}

#[derive(Debug, Clone)]
struct MockRule {
    matcher: Matcher,
    reply: MockReply,
}

#[derive(Debug, Clone)]
enum Matcher {
    InstructionContains(String),
    ImageEquals(Vec<u8>),
    NoImage,
}

#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Fail(String),
}

/// One recorded `submit` call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub instruction: String,
    pub image: Option<Vec<u8>>,
    pub media_type: Option<String>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            default_reply: MockReply::Text("Mock response".to_string()),
            model: "mock-vision".to_string(),
            latency_ms: 0,
            healthy: true,
        }
    }
}

impl MockInferenceClient {
    /// Create a new mock client with default configuration.
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the reply used when no rule matches.
    pub fn with_fixed_response(mut self, response: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).default_reply = MockReply::Text(response.into());
        self
    }

    /// Make every unmatched call fail.
    pub fn with_default_failure(mut self, message: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).default_reply = MockReply::Fail(message.into());
        self
    }

    /// Reply with `response` when the attached image equals `image`.
    pub fn respond_to_image(self, image: Vec<u8>, response: impl Into<String>) -> Self {
        self.with_rule(Matcher::ImageEquals(image), MockReply::Text(response.into()))
    }

    /// Fail when the attached image equals `image`.
    pub fn fail_for_image(self, image: Vec<u8>, message: impl Into<String>) -> Self {
        self.with_rule(Matcher::ImageEquals(image), MockReply::Fail(message.into()))
    }

    /// Reply with `response` to calls carrying no image.
    pub fn respond_without_image(self, response: impl Into<String>) -> Self {
        self.with_rule(Matcher::NoImage, MockReply::Text(response.into()))
    }

    /// Fail calls carrying no image.
    pub fn fail_without_image(self, message: impl Into<String>) -> Self {
        self.with_rule(Matcher::NoImage, MockReply::Fail(message.into()))
    }

    /// Reply with `response` when the instruction contains `needle`.
    pub fn respond_when_contains(
        self,
        needle: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.with_rule(
            Matcher::InstructionContains(needle.into()),
            MockReply::Text(response.into()),
        )
    }

    /// Set the reported model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).model = model.into();
        self
    }

    /// Set simulated latency for every call.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        Arc::make_mut(&mut self.config).latency_ms = latency_ms;
        self
    }

    /// Set the health check result.
    pub fn with_health(mut self, healthy: bool) -> Self {
        Arc::make_mut(&mut self.config).healthy = healthy;
        self
    }

    fn with_rule(mut self, matcher: Matcher, reply: MockReply) -> Self {
        Arc::make_mut(&mut self.config)
            .rules
            .push(MockRule { matcher, reply });
        self
    }

    fn log(&self) -> MutexGuard<'_, Vec<MockCall>> {
        self.call_log.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all logged calls for assertion.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.log().clone()
    }

    /// Total number of `submit` calls.
    pub fn call_count(&self) -> usize {
        self.log().len()
    }

    /// Number of calls that carried an image.
    pub fn image_call_count(&self) -> usize {
        self.log().iter().filter(|c| c.image.is_some()).count()
    }

    /// Number of calls that carried no image.
    pub fn text_call_count(&self) -> usize {
        self.log().iter().filter(|c| c.image.is_none()).count()
    }

    /// Clear the call log.
    pub fn clear_calls(&self) {
        self.log().clear()
    }

    fn resolve(&self, instruction: &str, image: Option<&[u8]>) -> &MockReply {
        self.config
            .rules
            .iter()
            .find(|rule| match &rule.matcher {
                Matcher::InstructionContains(needle) => instruction.contains(needle.as_str()),
                Matcher::ImageEquals(expected) => image == Some(expected.as_slice()),
                Matcher::NoImage => image.is_none(),
            })
            .map(|rule| &rule.reply)
            .unwrap_or(&self.config.default_reply)
    }
}

impl Default for MockInferenceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceClient for MockInferenceClient {
    async fn submit(
        &self,
        instruction: &str,
        attachment: Option<Attachment<'_>>,
    ) -> Result<String> {
        self.log().push(MockCall {
            instruction: instruction.to_string(),
            image: attachment.map(|a| a.data.to_vec()),
            media_type: attachment.map(|a| a.media_type.to_string()),
        });

        if self.config.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.config.latency_ms)).await;
        }

        match self.resolve(instruction, attachment.map(|a| a.data)) {
            MockReply::Text(text) => Ok(text.clone()),
            MockReply::Fail(message) => Err(Error::Inference(message.clone())),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.config.healthy)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
