//! # snapsort-inference
//!
//! Vision model clients for snapsort.
//!
//! This crate provides:
//! - Ollama implementation (default)
//! - OpenAI-compatible implementation (feature `openai`)
//! - Provider selection from environment configuration
//! - Structured (JSON) response recovery
//! - Deterministic mock client (feature `mock`)
//!
//! # Feature Flags
//!
//! - `ollama` (default): Enable Ollama client
//! - `openai` (default): Enable OpenAI-compatible client
//! - `mock`: Expose `MockInferenceClient` to downstream tests
//!
//! # Example
//!
//! ```rust,no_run
//! use snapsort_inference::client_from_env;
//! use snapsort_core::Attachment;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = client_from_env().unwrap();
//!     let image = std::fs::read("photo.jpg").unwrap();
//!     let raw = client
//!         .submit("Describe this image as JSON", Some(Attachment::new(&image, "image/jpeg")))
//!         .await
//!         .unwrap();
//!     println!("{}", raw);
//! }
//! ```

pub mod provider;
pub mod structured;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use snapsort_core::{Attachment, InferenceClient};

pub use provider::{client_from_env, InferenceProvider};
pub use structured::{extract_braced, parse_structured, ParseError};

#[cfg(feature = "ollama")]
pub use ollama::OllamaVisionClient;

#[cfg(feature = "openai")]
pub use openai::{OpenAIConfig, OpenAiVisionClient};

#[cfg(any(test, feature = "mock"))]
pub use mock::MockInferenceClient;
