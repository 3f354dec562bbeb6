//! In-memory fakes shared by the transfer and cleanup test suites.

use std::collections::{HashMap, HashSet};
use std::pin::Pin;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flashdrop_core::{AppError, Clock, FileRecord};
use flashdrop_db::FileRegistry;
use flashdrop_storage::{BlobStorage, BlobStream, StorageError, StorageResult, StoredBlob};
use tokio::io::AsyncRead;
use uuid::Uuid;

/// Registry backed by a plain map.
pub struct InMemoryRegistry {
    records: Mutex<HashMap<Uuid, FileRecord>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl FileRegistry for InMemoryRegistry {
    async fn insert(&self, record: &FileRecord) -> Result<(), AppError> {
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&record.public_id) {
            return Err(AppError::DuplicateId(record.public_id));
        }
        records.insert(record.public_id, record.clone());
        Ok(())
    }

    async fn find_by_public_id(&self, id: Uuid) -> Result<Option<FileRecord>, AppError> {
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }

    async fn delete_by_public_id(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.records.lock().unwrap().remove(&id).is_some())
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<FileRecord>, AppError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.expires_at < now)
            .cloned()
            .collect())
    }
}

/// Clock pinned to a settable instant.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

enum InsertFailure {
    Always,
    DuplicateOnce(Mutex<bool>),
}

/// Registry wrapper that injects insert failures, delegating the rest.
pub struct FailingInsertRegistry {
    inner: InMemoryRegistry,
    failure: InsertFailure,
}

impl FailingInsertRegistry {
    /// Every insert fails outright.
    pub fn failing() -> Self {
        Self {
            inner: InMemoryRegistry::new(),
            failure: InsertFailure::Always,
        }
    }

    /// The first insert reports an id collision, later ones succeed.
    pub fn duplicate_once() -> Self {
        Self {
            inner: InMemoryRegistry::new(),
            failure: InsertFailure::DuplicateOnce(Mutex::new(false)),
        }
    }

    pub fn inner(&self) -> &InMemoryRegistry {
        &self.inner
    }
}

#[async_trait]
impl FileRegistry for FailingInsertRegistry {
    async fn insert(&self, record: &FileRecord) -> Result<(), AppError> {
        match &self.failure {
            InsertFailure::Always => {
                Err(AppError::Internal("registry unavailable".to_string()))
            }
            InsertFailure::DuplicateOnce(tripped) => {
                let first = {
                    let mut tripped = tripped.lock().unwrap();
                    let first = !*tripped;
                    *tripped = true;
                    first
                };
                if first {
                    Err(AppError::DuplicateId(record.public_id))
                } else {
                    self.inner.insert(record).await
                }
            }
        }
    }

    async fn find_by_public_id(&self, id: Uuid) -> Result<Option<FileRecord>, AppError> {
        self.inner.find_by_public_id(id).await
    }

    async fn delete_by_public_id(&self, id: Uuid) -> Result<bool, AppError> {
        self.inner.delete_by_public_id(id).await
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<FileRecord>, AppError> {
        self.inner.find_expired(now).await
    }
}

/// Storage wrapper that fails deletes for chosen keys.
pub struct FailingDeleteStore<S> {
    inner: std::sync::Arc<S>,
    fail_keys: Mutex<HashSet<String>>,
}

impl<S: BlobStorage> FailingDeleteStore<S> {
    pub fn new(inner: std::sync::Arc<S>) -> Self {
        Self {
            inner,
            fail_keys: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_key(&self, key: &str) {
        self.fail_keys.lock().unwrap().insert(key.to_string());
    }

    pub fn clear_failures(&self) {
        self.fail_keys.lock().unwrap().clear();
    }
}

#[async_trait]
impl<S: BlobStorage> BlobStorage for FailingDeleteStore<S> {
    async fn put_stream<'a>(
        &self,
        reader: Pin<Box<dyn AsyncRead + Send + 'a>>,
        max_bytes: u64,
    ) -> StorageResult<StoredBlob> {
        self.inner.put_stream(reader, max_bytes).await
    }

    async fn get_stream(&self, key: &str) -> StorageResult<BlobStream> {
        self.inner.get_stream(key).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        if self.fail_keys.lock().unwrap().contains(key) {
            return Err(StorageError::DeleteFailed("injected failure".to_string()));
        }
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(key).await
    }
}
