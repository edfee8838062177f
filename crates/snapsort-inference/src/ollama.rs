//! Ollama vision client (e.g., qwen3-vl, llava).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use snapsort_core::{defaults, Attachment, Error, InferenceClient, Result};

/// Ollama-based vision client.
pub struct OllamaVisionClient {
    base_url: String,
    model: String,
    client: Client,
    timeout_secs: u64,
}

impl OllamaVisionClient {
    pub fn new(base_url: String, model: String) -> Self {
        Self::with_timeout(base_url, model, defaults::VISION_TIMEOUT_SECS)
    }

    pub fn with_timeout(base_url: String, model: String, timeout_secs: u64) -> Self {
        info!(
            "Initializing Ollama vision client: url={}, model={}",
            base_url, model
        );
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            client: Client::new(),
            timeout_secs,
        }
    }

    /// Create from environment variables.
    ///
    /// `OLLAMA_BASE` (or `OLLAMA_URL`), `OLLAMA_VISION_MODEL`,
    /// `OLLAMA_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let base_url = std::env::var("OLLAMA_BASE")
            .or_else(|_| std::env::var("OLLAMA_URL"))
            .unwrap_or_else(|_| defaults::OLLAMA_URL.to_string());
        let model = std::env::var(defaults::ENV_OLLAMA_VISION_MODEL)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| defaults::DEFAULT_OLLAMA_VISION_MODEL.to_string());
        let timeout_secs = std::env::var("OLLAMA_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults::VISION_TIMEOUT_SECS);
        Self::with_timeout(base_url, model, timeout_secs)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>, // base64 encoded
    stream: bool,
    /// Ollama format enforcement; `"json"` asks for a JSON object.
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

#[async_trait]
impl InferenceClient for OllamaVisionClient {
    #[instrument(skip(self, instruction, attachment), fields(subsystem = "inference", component = "ollama", op = "submit", model = %self.model, prompt_len = instruction.len()))]
    async fn submit(
        &self,
        instruction: &str,
        attachment: Option<Attachment<'_>>,
    ) -> Result<String> {
        let start = Instant::now();

        let images = attachment
            .map(|a| vec![base64::engine::general_purpose::STANDARD.encode(a.data)])
            .unwrap_or_default();

        let request = OllamaGenerateRequest {
            model: self.model.clone(),
            prompt: instruction.to_string(),
            images,
            stream: false,
            format: Some(serde_json::json!("json")),
        };

        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Vision request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let result: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Failed to parse vision response: {}", e)))?;

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            response_len = result.response.len(),
            duration_ms = elapsed,
            "Vision generation complete"
        );
        if elapsed > 30000 {
            warn!(duration_ms = elapsed, slow = true, "Slow vision request");
        }

        Ok(result.response)
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(defaults::HEALTH_TIMEOUT_SECS))
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
