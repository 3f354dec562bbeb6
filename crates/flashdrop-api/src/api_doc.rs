//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error::ErrorResponse;
use crate::handlers;
use crate::handlers::health::HealthResponse;
use flashdrop_core::{FileInfoResponse, UploadResponse};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Flashdrop API",
        version = "0.1.0",
        description = "Ephemeral file sharing: upload a file, get a time-limited download link and QR code. Files are deleted automatically after the retention window."
    ),
    paths(
        handlers::upload::upload_file,
        handlers::download::download_file,
        handlers::file_info::get_file_info,
        handlers::health::health_check,
    ),
    components(schemas(
        UploadResponse,
        FileInfoResponse,
        HealthResponse,
        ErrorResponse,
    )),
    tags(
        (name = "files", description = "Upload, download, and metadata for shared files"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
