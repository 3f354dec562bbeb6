use crate::traits::{BlobStorage, BlobStream, StorageError, StorageResult, StoredBlob};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

const WRITE_CHUNK_SIZE: usize = 64 * 1024;

/// Local filesystem blob store.
///
/// Deleting an object while a read of it is in progress is safe here: the
/// reader holds an open handle, and on the supported filesystems an unlinked
/// file stays readable until that handle closes.
#[derive(Clone)]
pub struct LocalBlobStore {
    base_path: PathBuf,
}

impl LocalBlobStore {
    /// Create a new store rooted at `base_path`, creating the directory tree
    /// if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(base_path.join("blobs"))
            .await
            .map_err(|e| {
                StorageError::ConfigError(format!(
                    "Failed to create storage directory {}: {}",
                    base_path.display(),
                    e
                ))
            })?;

        Ok(LocalBlobStore { base_path })
    }

    fn generate_key() -> String {
        format!("blobs/{}", Uuid::new_v4())
    }

    /// Convert an object key to a filesystem path, rejecting keys that could
    /// escape the base directory.
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.contains("..") || key.starts_with('/') || key.contains('\\') {
            return Err(StorageError::InvalidKey(
                "Object key contains invalid characters".to_string(),
            ));
        }
        Ok(self.base_path.join(key))
    }

    /// Remove a partially written object. The key was never handed out, so
    /// this only has to make the bytes unreachable on disk.
    async fn discard_partial(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial blob");
            }
        }
    }
}

#[async_trait]
impl BlobStorage for LocalBlobStore {
    async fn put_stream<'a>(
        &self,
        mut reader: Pin<Box<dyn AsyncRead + Send + 'a>>,
        max_bytes: u64,
    ) -> StorageResult<StoredBlob> {
        let key = Self::generate_key();
        let path = self.key_to_path(&key)?;
        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create {}: {}", path.display(), e))
        })?;

        let mut written: u64 = 0;
        let mut buf = vec![0u8; WRITE_CHUNK_SIZE];

        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    drop(file);
                    self.discard_partial(&path).await;
                    return Err(StorageError::WriteFailed(format!(
                        "Upload stream failed after {} bytes: {}",
                        written, e
                    )));
                }
            };

            written += n as u64;
            if written > max_bytes {
                drop(file);
                self.discard_partial(&path).await;
                return Err(StorageError::CapacityExceeded { limit: max_bytes });
            }

            if let Err(e) = file.write_all(&buf[..n]).await {
                drop(file);
                self.discard_partial(&path).await;
                return Err(StorageError::WriteFailed(format!(
                    "Failed to write {}: {}",
                    path.display(),
                    e
                )));
            }
        }

        if let Err(e) = file.sync_all().await {
            drop(file);
            self.discard_partial(&path).await;
            return Err(StorageError::WriteFailed(format!(
                "Failed to sync {}: {}",
                path.display(),
                e
            )));
        }

        tracing::debug!(
            key = %key,
            size_bytes = written,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Blob stored"
        );

        Ok(StoredBlob { key, size: written })
    }

    async fn get_stream(&self, key: &str) -> StorageResult<BlobStream> {
        let path = self.key_to_path(key)?;

        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.to_string()));
            }
            Err(e) => {
                return Err(StorageError::ReadFailed(format!(
                    "Failed to open {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let key = key.to_string();
        let stream = tokio_util::io::ReaderStream::new(file).map(move |result| {
            result.map_err(|e| {
                tracing::error!(key = %key, error = %e, "Blob read failed mid-stream");
                StorageError::ReadFailed(format!("Failed to read chunk: {}", e))
            })
        });

        Ok(Box::pin(stream))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(key = %key, "Blob deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }
}
