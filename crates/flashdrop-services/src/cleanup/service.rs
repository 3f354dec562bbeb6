use std::sync::Arc;
use std::time::Duration;

use flashdrop_core::{AppError, Clock};
use flashdrop_db::FileRegistry;
use flashdrop_storage::BlobStorage;
use tokio::time::interval;

/// Outcome of one sweep cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    /// Records the registry reported as expired this cycle.
    pub expired: usize,
    /// Records fully removed (blob and metadata).
    pub deleted: usize,
    /// Records left in place after a failed deletion, retried next cycle.
    pub failed: usize,
}

/// Background removal of expired files.
///
/// Runs on its own clock, independent of request traffic, so files whose
/// links are never revisited still get cleaned up.
#[derive(Clone)]
pub struct CleanupService {
    registry: Arc<dyn FileRegistry>,
    blobs: Arc<dyn BlobStorage>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl CleanupService {
    pub fn new(
        registry: Arc<dyn FileRegistry>,
        blobs: Arc<dyn BlobStorage>,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            blobs,
            clock,
            interval,
        }
    }

    /// Start the background sweeper loop.
    /// Returns a JoinHandle for graceful shutdown.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut sweep_interval = interval(self.interval);

            loop {
                sweep_interval.tick().await;

                tracing::info!("Starting scheduled sweep of expired files");

                match self.sweep().await {
                    Ok(stats) => {
                        tracing::info!(
                            expired = stats.expired,
                            deleted = stats.deleted,
                            failed = stats.failed,
                            "Sweep completed"
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Sweep cycle failed");
                    }
                }
            }
        })
    }

    /// Run one sweep cycle: fetch the expired batch and delete each record's
    /// blob, then its metadata.
    ///
    /// Failures are isolated per record. A record whose blob or metadata
    /// deletion fails stays in the registry, so `find_expired` resurfaces it
    /// on the next cycle. Races with download-side opportunistic deletion are
    /// benign because both delete paths are idempotent.
    #[tracing::instrument(skip(self))]
    pub async fn sweep(&self) -> Result<SweepStats, AppError> {
        let expired = self.registry.find_expired(self.clock.now()).await?;

        let mut stats = SweepStats {
            expired: expired.len(),
            ..SweepStats::default()
        };

        if expired.is_empty() {
            return Ok(stats);
        }

        for record in expired {
            tracing::info!(
                public_id = %record.public_id,
                object_key = %record.object_key,
                expires_at = %record.expires_at,
                "Deleting expired file"
            );

            if let Err(e) = self.blobs.delete(&record.object_key).await {
                tracing::error!(
                    public_id = %record.public_id,
                    object_key = %record.object_key,
                    error = %e,
                    "Failed to delete blob, keeping record for next cycle"
                );
                stats.failed += 1;
                continue;
            }

            match self.registry.delete_by_public_id(record.public_id).await {
                Ok(_) => {
                    tracing::debug!(public_id = %record.public_id, "Expired file removed");
                    stats.deleted += 1;
                }
                Err(e) => {
                    tracing::error!(
                        public_id = %record.public_id,
                        error = %e,
                        "Failed to delete metadata, keeping record for next cycle"
                    );
                    stats.failed += 1;
                }
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingDeleteStore, FixedClock, InMemoryRegistry};
    use chrono::{TimeZone, Utc};
    use flashdrop_core::FileRecord;
    use flashdrop_storage::LocalBlobStore;
    use std::pin::Pin;
    use tempfile::TempDir;
    use tokio::io::AsyncRead;

    fn reader(bytes: &[u8]) -> Pin<Box<dyn AsyncRead + Send>> {
        Box::pin(std::io::Cursor::new(bytes.to_vec()))
    }

    async fn store_record(
        registry: &InMemoryRegistry,
        blobs: &dyn BlobStorage,
        created_at: chrono::DateTime<Utc>,
        retention_secs: u64,
    ) -> FileRecord {
        let blob = blobs.put_stream(reader(b"payload"), 1024).await.unwrap();
        let record = FileRecord::new(
            blob.key,
            "f.txt".to_string(),
            7,
            "text/plain".to_string(),
            created_at,
            Duration::from_secs(retention_secs),
        );
        registry.insert(&record).await.unwrap();
        record
    }

    #[tokio::test]
    async fn test_sweep_deletes_only_expired_files() {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(InMemoryRegistry::new());
        let blobs = Arc::new(LocalBlobStore::new(dir.path()).await.unwrap());
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(FixedClock::new(start));

        let mut expired = Vec::new();
        for _ in 0..3 {
            expired.push(store_record(&registry, blobs.as_ref(), start, 60).await);
        }
        let mut live = Vec::new();
        for _ in 0..2 {
            live.push(store_record(&registry, blobs.as_ref(), start, 7200).await);
        }

        clock.advance(chrono::Duration::seconds(61));

        let service = CleanupService::new(
            registry.clone(),
            blobs.clone(),
            clock.clone(),
            Duration::from_secs(1800),
        );
        let stats = service.sweep().await.unwrap();

        assert_eq!(stats, SweepStats { expired: 3, deleted: 3, failed: 0 });

        for record in &expired {
            assert!(registry
                .find_by_public_id(record.public_id)
                .await
                .unwrap()
                .is_none());
            assert!(!blobs.exists(&record.object_key).await.unwrap());
        }
        for record in &live {
            assert!(registry
                .find_by_public_id(record.public_id)
                .await
                .unwrap()
                .is_some());
            assert!(blobs.exists(&record.object_key).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_sweep_with_empty_batch_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(InMemoryRegistry::new());
        let blobs = Arc::new(LocalBlobStore::new(dir.path()).await.unwrap());
        let clock = Arc::new(FixedClock::new(Utc::now()));

        let service =
            CleanupService::new(registry, blobs, clock, Duration::from_secs(1800));
        let stats = service.sweep().await.unwrap();

        assert_eq!(stats, SweepStats::default());
    }

    #[tokio::test]
    async fn test_blob_delete_failure_keeps_record_for_next_cycle() {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(InMemoryRegistry::new());
        let inner = Arc::new(LocalBlobStore::new(dir.path()).await.unwrap());
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(FixedClock::new(start));

        let stuck = store_record(&registry, inner.as_ref(), start, 60).await;
        let smooth = store_record(&registry, inner.as_ref(), start, 60).await;

        let blobs = Arc::new(FailingDeleteStore::new(inner.clone()));
        blobs.fail_key(&stuck.object_key);

        clock.advance(chrono::Duration::seconds(120));

        let service = CleanupService::new(
            registry.clone(),
            blobs.clone(),
            clock.clone(),
            Duration::from_secs(1800),
        );

        let stats = service.sweep().await.unwrap();
        assert_eq!(stats, SweepStats { expired: 2, deleted: 1, failed: 1 });

        // The failed record survives for the next cycle, the other is gone.
        assert!(registry
            .find_by_public_id(stuck.public_id)
            .await
            .unwrap()
            .is_some());
        assert!(registry
            .find_by_public_id(smooth.public_id)
            .await
            .unwrap()
            .is_none());

        // Once the failure clears, the retry removes it.
        blobs.clear_failures();
        let stats = service.sweep().await.unwrap();
        assert_eq!(stats, SweepStats { expired: 1, deleted: 1, failed: 0 });
        assert!(registry
            .find_by_public_id(stuck.public_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_sweep_tolerates_blob_already_gone() {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(InMemoryRegistry::new());
        let blobs = Arc::new(LocalBlobStore::new(dir.path()).await.unwrap());
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(FixedClock::new(start));

        let record = store_record(&registry, blobs.as_ref(), start, 60).await;
        // Simulate a racing download-side delete of the blob.
        blobs.delete(&record.object_key).await.unwrap();

        clock.advance(chrono::Duration::seconds(120));

        let service = CleanupService::new(
            registry.clone(),
            blobs,
            clock,
            Duration::from_secs(1800),
        );
        let stats = service.sweep().await.unwrap();

        assert_eq!(stats, SweepStats { expired: 1, deleted: 1, failed: 0 });
        assert!(registry
            .find_by_public_id(record.public_id)
            .await
            .unwrap()
            .is_none());
    }
}
