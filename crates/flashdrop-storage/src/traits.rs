//! Storage abstraction trait
//!
//! This module defines the BlobStorage trait that storage backends implement.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Blob exceeds size ceiling of {limit} bytes")]
    CapacityExceeded { limit: u64 },

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Forward-only chunk stream returned by `get_stream`.
pub type BlobStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// A successfully stored blob: its server-generated key and observed size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub key: String,
    pub size: u64,
}

/// Blob storage abstraction.
///
/// Backends persist write-once byte streams under opaque server-generated
/// keys. The upload ceiling is enforced here, during the streamed write,
/// because the payload length is unknown until the stream completes.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Consume `reader` to EOF and persist it under a fresh key.
    ///
    /// Bytes are written strictly in stream order. If the stream exceeds
    /// `max_bytes` the write is aborted with `CapacityExceeded`; on that or
    /// any I/O failure no partial object is left reachable by any key.
    async fn put_stream<'a>(
        &self,
        reader: Pin<Box<dyn AsyncRead + Send + 'a>>,
        max_bytes: u64,
    ) -> StorageResult<StoredBlob>;

    /// Lazily read the blob back as a forward-only chunk stream.
    ///
    /// Mid-stream failures surface as `ReadFailed` items; they are never
    /// retried here.
    async fn get_stream(&self, key: &str) -> StorageResult<BlobStream>;

    /// Delete a blob. Idempotent: absence of the object is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check if a blob exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;
}
