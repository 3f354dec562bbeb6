//! Time source abstraction.
//!
//! Expiry decisions compare against `Clock::now()` rather than calling
//! `Utc::now()` directly, so the transfer service and the cleanup sweeper can
//! be driven by a fixed clock in tests.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
