//! HTTP handlers for snapsort-api.

pub mod analyze;
pub mod export;
pub mod health;

pub use analyze::analyze;
pub use export::export_archive;
pub use health::health;
