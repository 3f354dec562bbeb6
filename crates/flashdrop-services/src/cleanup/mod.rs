mod service;

pub use service::{CleanupService, SweepStats};
