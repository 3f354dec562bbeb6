//! Application state shared across handlers.

use flashdrop_services::TransferService;
use std::time::Instant;

pub struct AppState {
    pub transfer: TransferService,
    /// Process start, for the /health uptime field.
    pub started_at: Instant,
}
