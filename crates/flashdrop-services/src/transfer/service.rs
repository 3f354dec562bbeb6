use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use flashdrop_core::{AppError, Clock, FileRecord};
use flashdrop_db::FileRegistry;
use flashdrop_storage::{BlobStorage, BlobStream, StorageError};
use tokio::io::AsyncRead;
use uuid::Uuid;

use crate::qr;

/// Bounded retries for the astronomically unlikely v4 id collision.
const MAX_ID_ATTEMPTS: u32 = 3;

/// Result of a completed upload, ready to serialize into the API response.
#[derive(Debug)]
pub struct UploadOutcome {
    pub record: FileRecord,
    pub download_url: String,
    pub qr_code: String,
}

/// A servable file: its metadata plus a lazy byte stream over the blob.
pub struct DownloadOutcome {
    pub record: FileRecord,
    pub stream: BlobStream,
}

impl std::fmt::Debug for DownloadOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadOutcome")
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

/// Core upload/download/metadata orchestration.
///
/// Transport-agnostic: consumes readers and returns plain structs, so the
/// HTTP layer stays a thin adapter and tests can drive it with fakes.
#[derive(Clone)]
pub struct TransferService {
    registry: Arc<dyn FileRegistry>,
    blobs: Arc<dyn BlobStorage>,
    clock: Arc<dyn Clock>,
    base_url: String,
    retention: Duration,
    max_file_size: u64,
}

impl TransferService {
    pub fn new(
        registry: Arc<dyn FileRegistry>,
        blobs: Arc<dyn BlobStorage>,
        clock: Arc<dyn Clock>,
        base_url: String,
        retention: Duration,
        max_file_size: u64,
    ) -> Self {
        Self {
            registry,
            blobs,
            clock,
            base_url,
            retention,
            max_file_size,
        }
    }

    /// Store an uploaded payload and register it for time-limited sharing.
    ///
    /// `declared_size` is an optional up-front length hint (e.g. from a
    /// Content-Length header); when it already exceeds the ceiling the
    /// payload is rejected without consuming the stream. The ceiling is
    /// enforced again during the streamed write regardless.
    #[tracing::instrument(skip(self, reader), fields(upload.filename = %filename))]
    pub async fn upload(
        &self,
        reader: Pin<Box<dyn AsyncRead + Send + '_>>,
        declared_size: Option<u64>,
        filename: &str,
        content_type: &str,
    ) -> Result<UploadOutcome, AppError> {
        if let Some(declared) = declared_size {
            if declared > self.max_file_size {
                return Err(AppError::PayloadTooLarge(format!(
                    "File exceeds the maximum size of {} bytes",
                    self.max_file_size
                )));
            }
        }

        let blob = self
            .blobs
            .put_stream(reader, self.max_file_size)
            .await
            .map_err(|e| match e {
                StorageError::CapacityExceeded { limit } => AppError::PayloadTooLarge(format!(
                    "File exceeds the maximum size of {} bytes",
                    limit
                )),
                other => AppError::Storage(other.to_string()),
            })?;

        if blob.size == 0 {
            self.discard_blob(&blob.key).await;
            return Err(AppError::EmptyFile);
        }

        let now = self.clock.now();
        let mut record = FileRecord::new(
            blob.key.clone(),
            filename.to_string(),
            blob.size as i64,
            content_type.to_string(),
            now,
            self.retention,
        );

        let mut attempts = 1;
        loop {
            match self.registry.insert(&record).await {
                Ok(()) => break,
                Err(AppError::DuplicateId(id)) if attempts < MAX_ID_ATTEMPTS => {
                    tracing::warn!(
                        public_id = %id,
                        attempts,
                        "Public id collision on insert, regenerating"
                    );
                    record.regenerate_public_id();
                    attempts += 1;
                }
                Err(AppError::DuplicateId(id)) => {
                    self.discard_blob(&blob.key).await;
                    return Err(AppError::Internal(format!(
                        "exhausted {} id generation attempts (last collision: {})",
                        MAX_ID_ATTEMPTS, id
                    )));
                }
                Err(e) => {
                    self.discard_blob(&blob.key).await;
                    return Err(e);
                }
            }
        }

        let download_url = self.download_url(record.public_id);
        let qr_code = match qr::data_url(&download_url) {
            Ok(qr_code) => qr_code,
            Err(e) => {
                // Roll back so no record ever exists without a response.
                if let Err(del_err) = self.registry.delete_by_public_id(record.public_id).await {
                    tracing::error!(
                        public_id = %record.public_id,
                        error = %del_err,
                        "Failed to roll back record after QR rendering failure"
                    );
                }
                self.discard_blob(&blob.key).await;
                return Err(e);
            }
        };

        tracing::info!(
            public_id = %record.public_id,
            size = record.size,
            expires_at = %record.expires_at,
            "File uploaded"
        );

        Ok(UploadOutcome {
            record,
            download_url,
            qr_code,
        })
    }

    /// Resolve a download link to the stored metadata plus a byte stream.
    ///
    /// Expired files answer `Gone` and are opportunistically deleted on the
    /// spot; failures of that deletion are logged and left to the sweeper.
    #[tracing::instrument(skip(self), fields(download.public_id = %id))]
    pub async fn download(&self, id: Uuid) -> Result<DownloadOutcome, AppError> {
        let record = self
            .registry
            .find_by_public_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        if record.is_expired(self.clock.now()) {
            tracing::debug!(public_id = %id, expires_at = %record.expires_at, "Download of expired file");
            self.delete_expired(&record).await;
            return Err(AppError::Gone("File has expired".to_string()));
        }

        let stream = self
            .blobs
            .get_stream(&record.object_key)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        Ok(DownloadOutcome { record, stream })
    }

    /// Look up file metadata without touching the blob.
    ///
    /// Expiry is reported but the delete side effect is deferred to the
    /// sweeper, keeping this path read-only.
    #[tracing::instrument(skip(self), fields(metadata.public_id = %id))]
    pub async fn metadata(&self, id: Uuid) -> Result<FileRecord, AppError> {
        let record = self
            .registry
            .find_by_public_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        if record.is_expired(self.clock.now()) {
            tracing::debug!(public_id = %id, "Metadata query for expired file");
            return Err(AppError::Gone("File has expired".to_string()));
        }

        Ok(record)
    }

    pub fn download_url(&self, id: Uuid) -> String {
        format!("{}/download/{}", self.base_url, id)
    }

    /// Best-effort removal of an expired file, blob first so a half-done
    /// delete is resurfaced by the sweeper rather than orphaning the blob.
    async fn delete_expired(&self, record: &FileRecord) {
        if let Err(e) = self.blobs.delete(&record.object_key).await {
            tracing::error!(
                public_id = %record.public_id,
                object_key = %record.object_key,
                error = %e,
                "Failed to delete expired blob, leaving record for the sweeper"
            );
            return;
        }

        if let Err(e) = self.registry.delete_by_public_id(record.public_id).await {
            tracing::error!(
                public_id = %record.public_id,
                error = %e,
                "Failed to delete expired record, leaving it for the sweeper"
            );
        }
    }

    async fn discard_blob(&self, key: &str) {
        if let Err(e) = self.blobs.delete(key).await {
            tracing::error!(object_key = %key, error = %e, "Failed to discard blob");
        }
    }
}
