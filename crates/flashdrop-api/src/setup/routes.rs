//! Route configuration and setup.

use crate::api_doc::ApiDoc;
use crate::handlers;
use crate::middleware::rate_limit::{rate_limit_middleware, RouteRateLimiter};
use crate::state::AppState;
use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use flashdrop_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

const HTTP_CONCURRENCY_LIMIT: usize = 1024;
// Multipart framing overhead on top of the file itself.
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router> {
    let cors = setup_cors(config)?;

    let upload_limiter = RouteRateLimiter::new("upload", config.upload_rate_limit);
    let download_limiter = RouteRateLimiter::new("download", config.download_rate_limit);
    let metadata_limiter = RouteRateLimiter::new("metadata", config.metadata_rate_limit);

    let upload_routes = Router::new()
        .route("/api/upload", post(handlers::upload::upload_file))
        .route_layer(axum::middleware::from_fn_with_state(
            upload_limiter,
            rate_limit_middleware,
        ));

    let download_routes = Router::new()
        .route("/api/download/{id}", get(handlers::download::download_file))
        .route_layer(axum::middleware::from_fn_with_state(
            download_limiter,
            rate_limit_middleware,
        ));

    let metadata_routes = Router::new()
        .route("/api/file/{id}", get(handlers::file_info::get_file_info))
        .route_layer(axum::middleware::from_fn_with_state(
            metadata_limiter,
            rate_limit_middleware,
        ));

    let body_limit = config.max_file_size_bytes as usize + BODY_LIMIT_SLACK;

    let app = Router::new()
        .merge(upload_routes)
        .merge(download_routes)
        .merge(metadata_routes)
        .route("/health", get(handlers::health::health_check))
        .route(
            "/",
            get(|| async { (StatusCode::OK, "flashdrop file sharing service is running") }),
        )
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .layer(ConcurrencyLimitLayer::new(HTTP_CONCURRENCY_LIMIT))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn setup_cors(config: &Config) -> Result<CorsLayer> {
    let cors = if config.cors_origins.contains(&"*".to_string()) {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins: Result<Vec<HeaderValue>, _> =
            config.cors_origins.iter().map(|o| o.parse()).collect();
        CorsLayer::new()
            .allow_origin(origins.unwrap_or_default())
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    };
    Ok(cors)
}
