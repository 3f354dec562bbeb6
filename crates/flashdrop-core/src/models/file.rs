//! File domain model and public API response shapes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// One uploaded file. Created atomically by a successful upload, read-only
/// afterwards, destroyed by the cleanup sweeper or an opportunistic delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Externally visible identifier; random v4, unguessable. Holding this id
    /// is the only way to address the file.
    pub public_id: Uuid,
    /// Blob store reference, exclusively owned by this record.
    pub object_key: String,
    /// Original filename, informational; used for Content-Disposition.
    pub filename: String,
    pub size: i64,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
    /// `created_at + retention`. Never mutated after creation.
    pub expires_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn new(
        object_key: String,
        filename: String,
        size: i64,
        content_type: String,
        created_at: DateTime<Utc>,
        retention: std::time::Duration,
    ) -> Self {
        let retention = Duration::from_std(retention).unwrap_or_else(|_| Duration::hours(2));
        Self {
            public_id: Uuid::new_v4(),
            object_key,
            filename,
            size,
            content_type,
            created_at,
            expires_at: created_at + retention,
        }
    }

    /// Replace the public id with a freshly generated one. Used when an
    /// insert hits a duplicate-id collision.
    pub fn regenerate_public_id(&mut self) {
        self.public_id = Uuid::new_v4();
    }

    /// Strict comparison: the file is expired once `now` is past
    /// `expires_at`, with no grace period.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Response body for `POST /api/upload`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub id: Uuid,
    pub filename: String,
    pub size: i64,
    pub download_url: String,
    /// PNG data URL encoding of `download_url`.
    pub qr_code: String,
    pub expires_at: DateTime<Utc>,
}

/// Response body for `GET /api/file/:id`. Public fields only; the blob
/// reference never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileInfoResponse {
    pub id: Uuid,
    pub filename: String,
    pub size: i64,
    pub mimetype: String,
    pub upload_time: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<&FileRecord> for FileInfoResponse {
    fn from(record: &FileRecord) -> Self {
        Self {
            id: record.public_id,
            filename: record.filename.clone(),
            size: record.size,
            mimetype: record.content_type.clone(),
            upload_time: record.created_at,
            expires_at: record.expires_at,
        }
    }
}
