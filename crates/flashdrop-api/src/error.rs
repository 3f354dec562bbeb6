//! HTTP error response conversion
//!
//! This module provides HTTP-specific error response conversion for AppError.
//!
//! **Preferred handler pattern:** Return `Result<impl IntoResponse, HttpAppError>`.
//! Use `AppError` for errors and let `?` convert them into `HttpAppError` so they
//! render consistently (status, body, logging).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use flashdrop_core::{AppError, ErrorMetadata, LogLevel};
use flashdrop_storage::StorageError;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

/// Wrapper type for AppError to implement IntoResponse
/// This is necessary because of Rust's orphan rules - we can't implement
/// IntoResponse (external trait) for AppError (external type from flashdrop-core)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::Internal(err.to_string()))
    }
}

// Convert storage errors to HttpAppError (avoids orphan rule: we impl for local HttpAppError)
impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        let app = match err {
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::CapacityExceeded { limit } => AppError::PayloadTooLarge(format!(
                "File exceeds the maximum size of {} bytes",
                limit
            )),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            other => AppError::Storage(other.to_string()),
        };
        HttpAppError(app)
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;
        let is_production = is_production_env();

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        // Always hide details in production; elsewhere only for non-sensitive errors.
        let body = if is_production || app_error.is_sensitive() {
            Json(ErrorResponse {
                error: app_error.client_message(),
                code: app_error.error_code().to_string(),
                details: None,
                error_type: None,
            })
        } else {
            Json(ErrorResponse {
                error: app_error.client_message(),
                code: app_error.error_code().to_string(),
                details: Some(app_error.detailed_message()),
                error_type: Some(app_error.error_type().to_string()),
            })
        };

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_storage_error_not_found() {
        let storage_err = StorageError::NotFound("Blob not found".to_string());
        let HttpAppError(app_err) = storage_err.into();
        match app_err {
            AppError::NotFound(msg) => assert_eq!(msg, "Blob not found"),
            _ => panic!("Expected NotFound variant"),
        }
    }

    #[test]
    fn test_from_storage_error_capacity_exceeded() {
        let storage_err = StorageError::CapacityExceeded { limit: 500 };
        let HttpAppError(app_err) = storage_err.into();
        match app_err {
            AppError::PayloadTooLarge(msg) => assert!(msg.contains("500")),
            _ => panic!("Expected PayloadTooLarge variant"),
        }
    }

    #[test]
    fn test_from_storage_error_write_failed_is_sensitive() {
        let storage_err = StorageError::WriteFailed("disk full".to_string());
        let HttpAppError(app_err) = storage_err.into();
        match &app_err {
            AppError::Storage(msg) => assert!(msg.contains("disk full")),
            _ => panic!("Expected Storage variant"),
        }
        assert!(app_err.is_sensitive());
    }

    /// Verifies the public error response contract: serialized ErrorResponse
    /// has "error" and "code", and optionally "details" / "error_type".
    #[test]
    fn test_error_response_shape() {
        let response = ErrorResponse {
            error: "File not found".to_string(),
            code: "NOT_FOUND".to_string(),
            details: None,
            error_type: None,
        };
        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(
            json.get("error").and_then(|v| v.as_str()),
            Some("File not found")
        );
        assert_eq!(json.get("code").and_then(|v| v.as_str()), Some("NOT_FOUND"));
        assert!(json.get("details").is_none());
        assert!(json.get("error_type").is_none());
    }
}
