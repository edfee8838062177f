//! Inference provider selection.
//!
//! The provider is chosen by `INFERENCE_PROVIDER`:
//!
//! ```text
//! INFERENCE_PROVIDER=ollama      → Ollama /api/generate (default)
//! INFERENCE_PROVIDER=openai      → OpenAI-compatible /chat/completions
//! INFERENCE_PROVIDER=openrouter  → OpenAI-compatible, OpenRouter headers honoured
//! ```
//!
//! Backends are feature-gated (`ollama`, `openai`); selecting a provider
//! whose feature is disabled is a configuration error.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use snapsort_core::{defaults, Error, InferenceClient, Result};

/// Supported inference providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceProvider {
    #[default]
    Ollama,
    OpenAi,
}

impl fmt::Display for InferenceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::OpenAi => write!(f, "openai"),
        }
    }
}

impl FromStr for InferenceProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "ollama" => Ok(Self::Ollama),
            "openai" | "openrouter" | "openai-compatible" => Ok(Self::OpenAi),
            other => Err(Error::Config(format!(
                "Unknown inference provider '{}' (expected 'ollama' or 'openai')",
                other
            ))),
        }
    }
}

impl InferenceProvider {
    /// Read the provider from `INFERENCE_PROVIDER`, defaulting to Ollama.
    pub fn from_env() -> Result<Self> {
        match std::env::var(defaults::ENV_INFERENCE_PROVIDER) {
            Ok(value) => value.parse(),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Build a client for this provider from environment configuration.
    pub fn client_from_env(self) -> Result<Arc<dyn InferenceClient>> {
        match self {
            Self::Ollama => ollama_client(),
            Self::OpenAi => openai_client(),
        }
    }
}

/// Build the configured inference client from environment variables.
pub fn client_from_env() -> Result<Arc<dyn InferenceClient>> {
    let provider = InferenceProvider::from_env()?;
    let client = provider.client_from_env()?;
    info!(
        subsystem = "inference",
        provider = %provider,
        model = client.model_name(),
        "Inference client configured"
    );
    Ok(client)
}

#[cfg(feature = "ollama")]
fn ollama_client() -> Result<Arc<dyn InferenceClient>> {
    Ok(Arc::new(crate::ollama::OllamaVisionClient::from_env()))
}

#[cfg(not(feature = "ollama"))]
fn ollama_client() -> Result<Arc<dyn InferenceClient>> {
    Err(Error::Config(
        "Ollama provider requested but the `ollama` feature is disabled".to_string(),
    ))
}

#[cfg(feature = "openai")]
fn openai_client() -> Result<Arc<dyn InferenceClient>> {
    Ok(Arc::new(crate::openai::OpenAiVisionClient::from_env()?))
}

#[cfg(not(feature = "openai"))]
fn openai_client() -> Result<Arc<dyn InferenceClient>> {
    Err(Error::Config(
        "OpenAI provider requested but the `openai` feature is disabled".to_string(),
    ))
}
