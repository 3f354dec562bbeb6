//! Application setup and initialization
//!
//! All application initialization logic lives here rather than in main.rs
//! for better organization and testability.

pub mod database;
pub mod routes;
pub mod server;

use crate::state::AppState;
use anyhow::{Context, Result};
use flashdrop_core::{Clock, Config, SystemClock};
use flashdrop_db::{FileRegistry, PgFileRegistry};
use flashdrop_services::{CleanupService, TransferService};
use flashdrop_storage::{BlobStorage, LocalBlobStore};
use std::sync::Arc;
use std::time::Instant;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;

    let pool = database::setup_database(&config).await?;

    let blobs: Arc<dyn BlobStorage> = Arc::new(
        LocalBlobStore::new(&config.storage_path)
            .await
            .context("Failed to initialize blob storage")?,
    );
    tracing::info!(storage_path = %config.storage_path, "Blob storage ready");

    let registry: Arc<dyn FileRegistry> = Arc::new(PgFileRegistry::new(pool));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let transfer = TransferService::new(
        registry.clone(),
        blobs.clone(),
        clock.clone(),
        config.base_url.clone(),
        config.retention,
        config.max_file_size_bytes,
    );

    Arc::new(CleanupService::new(
        registry,
        blobs,
        clock,
        config.cleanup_interval,
    ))
    .start();
    tracing::info!(
        interval_secs = config.cleanup_interval.as_secs(),
        "Expiry sweeper started"
    );

    let state = Arc::new(AppState {
        transfer,
        started_at: Instant::now(),
    });

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
