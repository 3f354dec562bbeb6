use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Response, StatusCode},
    response::IntoResponse,
};
use flashdrop_core::AppError;
use futures::StreamExt;
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/download/{id}",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "Public file ID")
    ),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 410, description = "File has expired", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(file_id = %id, operation = "download_file"))]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let outcome = state.transfer.download(id).await?;

    tracing::debug!(
        file_id = %id,
        object_key = %outcome.record.object_key,
        "Proxying blob from storage"
    );

    // Wrap storage stream for axum Body
    let body_stream = outcome.stream.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
    });

    let content_disposition = format!("attachment; filename=\"{}\"", outcome.record.filename);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, outcome.record.content_type.as_str())
        .header(header::CONTENT_DISPOSITION, content_disposition.as_str())
        .header(header::CONTENT_LENGTH, outcome.record.size)
        .body(Body::from_stream(body_stream))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}
