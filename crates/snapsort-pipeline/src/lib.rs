//! # snapsort-pipeline
//!
//! The analyze-then-categorize pipeline and archive export.
//!
//! This crate provides:
//! - Item ingestion (data URIs, multipart files, HEIC → JPEG)
//! - Concurrent per-item analysis with per-item failure isolation
//! - One-call category synthesis with a theme-partition fallback
//! - Result assembly that partitions every index into one category
//! - tar.gz export with category folders and a summary report
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use snapsort_pipeline::{RawImage, SortPipeline};
//!
//! let client = snapsort_inference::client_from_env()?;
//! let pipeline = SortPipeline::from_env(client);
//!
//! let response = pipeline
//!     .run(vec![RawImage::encoded("data:image/png;base64,...")], None)
//!     .await?;
//! for result in &response.results {
//!     println!("{} -> {}", result.index, result.analysis.category);
//! }
//! ```

pub mod analyzer;
pub mod assembler;
pub mod export;
pub mod ingest;
pub mod normalize;
pub mod pipeline;
pub mod prompts;
pub mod synthesizer;
pub mod transcode;

pub use analyzer::{record_from_response, Analyzer};
pub use assembler::{assemble, normalize_categories};
pub use export::{archive_file_name, build_archive, plan_archive, summary_report, ArchiveEntry};
pub use ingest::{decode_payload, validate_batch_size, Ingestor, RawImage};
pub use pipeline::{PipelineConfig, SortPipeline};
pub use synthesizer::{categories_from_response, theme_partition, CategorySource, Synthesis, Synthesizer};
pub use transcode::CommandTranscoder;
