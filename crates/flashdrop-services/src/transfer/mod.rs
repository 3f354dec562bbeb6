mod service;

pub use service::{DownloadOutcome, TransferService, UploadOutcome};
