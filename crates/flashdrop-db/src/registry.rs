use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flashdrop_core::{AppError, FileRecord};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Metadata registry contract.
///
/// `insert` must fail with `DuplicateId` on a `public_id` collision;
/// `delete_by_public_id` is idempotent; `find_expired` produces one finite
/// batch per call, ordering irrelevant.
#[async_trait]
pub trait FileRegistry: Send + Sync {
    async fn insert(&self, record: &FileRecord) -> Result<(), AppError>;

    async fn find_by_public_id(&self, id: Uuid) -> Result<Option<FileRecord>, AppError>;

    /// Returns `true` when a record was actually deleted.
    async fn delete_by_public_id(&self, id: Uuid) -> Result<bool, AppError>;

    /// All records with `expires_at < now`.
    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<FileRecord>, AppError>;
}

#[derive(Debug, sqlx::FromRow)]
struct FileRow {
    public_id: Uuid,
    object_key: String,
    filename: String,
    size: i64,
    content_type: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl From<FileRow> for FileRecord {
    fn from(row: FileRow) -> Self {
        FileRecord {
            public_id: row.public_id,
            object_key: row.object_key,
            filename: row.filename,
            size: row.size,
            content_type: row.content_type,
            created_at: row.created_at,
            expires_at: row.expires_at,
        }
    }
}

/// Postgres-backed file registry.
#[derive(Clone)]
pub struct PgFileRegistry {
    pool: PgPool,
}

impl PgFileRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileRegistry for PgFileRegistry {
    #[tracing::instrument(skip(self, record), fields(db.table = "files", db.operation = "insert", db.record_id = %record.public_id))]
    async fn insert(&self, record: &FileRecord) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO files (
                public_id, object_key, filename, size, content_type,
                created_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.public_id)
        .bind(&record.object_key)
        .bind(&record.filename)
        .bind(record.size)
        .bind(&record.content_type)
        .bind(record.created_at)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(AppError::DuplicateId(record.public_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select", db.record_id = %id))]
    async fn find_by_public_id(&self, id: Uuid) -> Result<Option<FileRecord>, AppError> {
        let row: Option<FileRow> = sqlx::query_as::<Postgres, FileRow>(
            "SELECT * FROM files WHERE public_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(FileRecord::from))
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "delete", db.record_id = %id))]
    async fn delete_by_public_id(&self, id: Uuid) -> Result<bool, AppError> {
        let rows_affected = sqlx::query("DELETE FROM files WHERE public_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select"))]
    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<FileRecord>, AppError> {
        let rows: Vec<FileRow> = sqlx::query_as::<Postgres, FileRow>(
            "SELECT * FROM files WHERE expires_at < $1 ORDER BY expires_at ASC",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(FileRecord::from).collect())
    }
}
