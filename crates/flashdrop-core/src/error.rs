//! Error types module
//!
//! All errors are unified under the `AppError` enum, which covers database,
//! storage, validation, and lifecycle errors. Each variant self-describes its
//! HTTP presentation through the `ErrorMetadata` trait so transport layers
//! never pattern-match on variants to pick a status code.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like lookups of expired files
    Debug,
    /// Warning level - for recoverable issues like rejected oversized uploads
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "FILE_EXPIRED")
    fn error_code(&self) -> &'static str;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from clients
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The id was once valid but the file is past its retention window.
    /// Expected branch, not a fault.
    #[error("Gone: {0}")]
    Gone(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Empty file rejected")]
    EmptyFile,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Public id collision on insert. Statistically unreachable with random
    /// v4 ids; retried internally with a fresh id, never shown to callers.
    #[error("Duplicate public id: {0}")]
    DuplicateId(uuid::Uuid),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Static metadata per variant: (http_status, error_code, sensitive, log_level).
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, bool, LogLevel) {
    match err {
        AppError::Database(_) => (500, "DATABASE_ERROR", true, LogLevel::Error),
        AppError::Storage(_) => (500, "STORAGE_ERROR", true, LogLevel::Error),
        AppError::NotFound(_) => (404, "NOT_FOUND", false, LogLevel::Debug),
        AppError::Gone(_) => (410, "FILE_EXPIRED", false, LogLevel::Debug),
        AppError::PayloadTooLarge(_) => (413, "FILE_TOO_LARGE", false, LogLevel::Warn),
        AppError::EmptyFile => (400, "EMPTY_FILE", false, LogLevel::Debug),
        AppError::InvalidInput(_) => (400, "INVALID_INPUT", false, LogLevel::Debug),
        // An id collision must never leak the colliding id to the caller.
        AppError::DuplicateId(_) => (500, "INTERNAL_ERROR", true, LogLevel::Error),
        AppError::Internal(_) => (500, "INTERNAL_ERROR", true, LogLevel::Error),
    }
}

impl AppError {
    /// Error type name for non-production error detail responses.
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::NotFound(_) => "NotFound",
            AppError::Gone(_) => "Gone",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::EmptyFile => "EmptyFile",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::DuplicateId(_) => "DuplicateId",
            AppError::Internal(_) => "Internal",
        }
    }

    /// Detailed message including the source error chain.
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();
        let mut source = self.source();
        while let Some(err) = source {
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }
        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Gone(ref msg) => msg.clone(),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::EmptyFile => "File is empty".to_string(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::DuplicateId(_) => "Internal server error".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}
