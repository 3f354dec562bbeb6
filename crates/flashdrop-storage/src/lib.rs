//! Flashdrop Storage Library
//!
//! Blob storage abstraction and the local filesystem backend.
//!
//! # Object keys
//!
//! Keys are opaque, server-generated, and write-once: `blobs/{uuid}`. A key
//! is never reachable by readers until `put_stream` has fully succeeded, so a
//! failed or interrupted upload leaves no partial object behind. Keys must
//! not contain `..` or a leading `/`.

pub mod local;
pub mod traits;

// Re-export commonly used types
pub use local::LocalBlobStore;
pub use traits::{BlobStorage, BlobStream, StorageError, StorageResult, StoredBlob};
