pub mod file;

pub use file::{FileInfoResponse, FileRecord, UploadResponse};
