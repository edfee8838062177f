//! OpenAI-compatible vision client.
//!
//! Works with any endpoint that accepts chat completions with `image_url`
//! content parts, including:
//!
//! - OpenAI cloud API
//! - OpenRouter
//! - Ollama (in OpenAI compatibility mode)
//! - vLLM, LocalAI, LM Studio
//!
//! # Example
//!
//! ```rust,no_run
//! use snapsort_inference::openai::{OpenAIConfig, OpenAiVisionClient};
//! use snapsort_core::{Attachment, InferenceClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = OpenAIConfig {
//!         base_url: "http://localhost:11434/v1".to_string(),
//!         model: "qwen3-vl:8b".to_string(),
//!         ..Default::default()
//!     };
//!     let client = OpenAiVisionClient::new(config).unwrap();
//!
//!     let image = std::fs::read("receipt.jpg").unwrap();
//!     let text = client
//!         .submit("Describe this image as JSON", Some(Attachment::new(&image, "image/jpeg")))
//!         .await
//!         .unwrap();
//!     println!("{}", text);
//! }
//! ```

mod backend;
mod error;
mod types;

pub use backend::{
    data_uri, OpenAIConfig, OpenAiVisionClient, DEFAULT_OPENAI_URL, DEFAULT_TIMEOUT_SECS,
    DEFAULT_VISION_MODEL,
};
pub use error::VisionFailure;
pub use types::*;
