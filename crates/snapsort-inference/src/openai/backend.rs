//! OpenAI-compatible vision client implementation.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use snapsort_core::{defaults, Attachment, Error, InferenceClient, Result};

use super::error::VisionFailure;
use super::types::*;

/// Default OpenAI API endpoint.
pub const DEFAULT_OPENAI_URL: &str = defaults::OPENAI_URL;

/// Default vision-capable model.
pub const DEFAULT_VISION_MODEL: &str = defaults::DEFAULT_OPENAI_VISION_MODEL;

/// Default timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = defaults::VISION_TIMEOUT_SECS;

/// Configuration for OpenAI-compatible client.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// Base URL for the API endpoint.
    pub base_url: String,
    /// API key for authentication (optional for local endpoints).
    pub api_key: Option<String>,
    /// Vision-capable chat model.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// Ask the endpoint for a JSON object response.
    pub json_mode: bool,
    /// HTTP-Referer header for OpenRouter.ai rankings (optional).
    pub http_referer: Option<String>,
    /// X-Title header for app name on OpenRouter.ai (optional).
    pub x_title: Option<String>,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OPENAI_URL.to_string(),
            api_key: None,
            model: DEFAULT_VISION_MODEL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            json_mode: true,
            http_referer: None,
            x_title: None,
        }
    }
}

impl OpenAIConfig {
    /// Read configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_URL.to_string()),
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            model: std::env::var("OPENAI_VISION_MODEL")
                .unwrap_or_else(|_| DEFAULT_VISION_MODEL.to_string()),
            timeout_seconds: std::env::var("OPENAI_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            json_mode: std::env::var("OPENAI_JSON_MODE")
                .map(|v| v != "0" && v.to_lowercase() != "false")
                .unwrap_or(true),
            http_referer: std::env::var("OPENAI_HTTP_REFERER").ok(),
            x_title: std::env::var("OPENAI_X_TITLE").ok(),
        }
    }
}

/// OpenAI-compatible vision client.
pub struct OpenAiVisionClient {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAiVisionClient {
    /// Create a new client with the given configuration.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Initializing OpenAI vision client: url={}, model={}",
            config.base_url, config.model
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAIConfig::from_env())
    }

    /// Get the current configuration.
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    /// Attach authentication and OpenRouter headers if configured.
    fn authorize(&self, mut req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }
        if let Some(ref referer) = self.config.http_referer {
            req = req.header("HTTP-Referer", referer);
        }
        if let Some(ref title) = self.config.x_title {
            req = req.header("X-Title", title);
        }
        req
    }

    fn build_request(
        &self,
        instruction: &str,
        attachment: Option<Attachment<'_>>,
    ) -> ChatCompletionRequest {
        let mut content = vec![ContentPart::Text {
            text: instruction.to_string(),
        }];
        if let Some(attachment) = attachment {
            content.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: data_uri(attachment),
                },
            });
        }

        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content,
            }],
            temperature: None,
            max_tokens: None,
            response_format: self.config.json_mode.then(ResponseFormat::json_object),
            stream: false,
        }
    }
}

/// Encode an attachment as a `data:` URI.
pub fn data_uri(attachment: Attachment<'_>) -> String {
    format!(
        "data:{};base64,{}",
        attachment.media_type,
        base64::engine::general_purpose::STANDARD.encode(attachment.data)
    )
}

#[async_trait]
impl InferenceClient for OpenAiVisionClient {
    #[instrument(skip(self, instruction, attachment), fields(subsystem = "inference", component = "openai", op = "submit", model = %self.config.model, prompt_len = instruction.len()))]
    async fn submit(
        &self,
        instruction: &str,
        attachment: Option<Attachment<'_>>,
    ) -> Result<String> {
        let image_attached = attachment.is_some();
        let request = self.build_request(instruction, attachment);

        let response = self
            .authorize(self.client.post(self.url("/chat/completions")))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body: OpenAIErrorResponse = response.json().await.unwrap_or(OpenAIErrorResponse {
                error: OpenAIError {
                    message: "Unknown error".to_string(),
                    error_type: "unknown".to_string(),
                    code: None,
                },
            });
            let failure = VisionFailure::classify(status.as_u16(), &body.error, image_attached);
            warn!(status = status.as_u16(), failure = ?failure, "Chat completion refused");
            return Err(failure.into_error(&format!(
                "OpenAI returned {}: {}",
                status, body.error.message
            )));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Failed to parse response: {}", e)))?;

        let content = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        debug!(response_len = content.len(), "Generation complete");
        Ok(content)
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .authorize(self.client.get(self.url("/models")))
            .timeout(Duration::from_secs(defaults::HEALTH_TIMEOUT_SECS))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => Ok(true),
            Ok(resp) => {
                warn!("OpenAI health check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("OpenAI health check failed: {}", e);
                Ok(false)
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
