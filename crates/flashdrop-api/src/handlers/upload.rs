use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Multipart, State},
    Json,
};
use flashdrop_core::{AppError, UploadResponse};
use futures::TryStreamExt;
use std::sync::Arc;
use tokio_util::io::StreamReader;

const FILE_FIELD: &str = "file";

#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "files",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File uploaded successfully", body = UploadResponse),
        (status = 400, description = "Missing or empty file", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_file"))]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, HttpAppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or("unnamed").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        // Stream the part straight into storage without buffering it in
        // memory. The request body limit layer handles oversized requests
        // before this point; the storage ceiling is the authoritative check.
        let reader = StreamReader::new(field.map_err(std::io::Error::other));

        let outcome = state
            .transfer
            .upload(Box::pin(reader), None, &filename, &content_type)
            .await?;

        return Ok(Json(UploadResponse {
            id: outcome.record.public_id,
            filename: outcome.record.filename,
            size: outcome.record.size,
            download_url: outcome.download_url,
            qr_code: outcome.qr_code,
            expires_at: outcome.record.expires_at,
        }));
    }

    Err(AppError::InvalidInput(format!("Missing \"{}\" field in multipart body", FILE_FIELD)).into())
}
