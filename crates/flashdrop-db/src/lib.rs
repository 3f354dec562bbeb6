//! Flashdrop metadata registry
//!
//! Database access for file records. The `FileRegistry` trait is the narrow
//! contract the transfer service and cleanup sweeper depend on;
//! `PgFileRegistry` is the Postgres implementation. Uniqueness of `public_id`
//! is enforced by the primary key, not trusted to callers.

pub mod registry;

pub use registry::{FileRegistry, PgFileRegistry};

/// Embedded migrations; applied at startup by the API bootstrap.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
