use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use flashdrop_core::FileInfoResponse;
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/file/{id}",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "Public file ID")
    ),
    responses(
        (status = 200, description = "File metadata", body = FileInfoResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 410, description = "File has expired", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(file_id = %id, operation = "get_file_info"))]
pub async fn get_file_info(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<FileInfoResponse>, HttpAppError> {
    let record = state.transfer.metadata(id).await?;
    Ok(Json(FileInfoResponse::from(&record)))
}
