//! # snapsort-core
//!
//! Core types, traits, and abstractions for snapsort.
//!
//! This crate provides the data model shared by the analyze pipeline and
//! the HTTP layer, the collaborator traits the pipeline is built against,
//! and the centralized defaults.
//!
//! ## Logging
//!
//! Spans carry `subsystem`, `component` and `op` fields. Levels:
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events and request completions |
//! | DEBUG | Decision points and intermediate values |

pub mod defaults;
pub mod error;
pub mod media;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use media::{detect_media_type, extension_for_media_type, is_heic, sanitize_filename};
pub use models::*;
pub use traits::*;
