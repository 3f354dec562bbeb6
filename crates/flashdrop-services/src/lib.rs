pub mod cleanup;
pub mod qr;
pub mod transfer;

pub use cleanup::{CleanupService, SweepStats};
pub use transfer::{DownloadOutcome, TransferService, UploadOutcome};

#[cfg(test)]
pub(crate) mod test_support;
