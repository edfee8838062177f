//! Error types for snapsort.

use thiserror::Error;

/// Result type alias using snapsort's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for snapsort operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Inference collaborator call failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Image format conversion failed
    #[error("Transcode error: {0}")]
    Transcode(String),

    /// Archive export failed
    #[error("Archive error: {0}")]
    Archive(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
