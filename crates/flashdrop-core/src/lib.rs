//! Flashdrop Core Library
//!
//! This crate provides the domain model, error types, configuration, and the
//! clock abstraction shared across all flashdrop components.

pub mod clock;
pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{FileInfoResponse, FileRecord, UploadResponse};
