//! Fixed clock for deterministic submission timestamps.

use chrono::{DateTime, TimeZone, Utc};
use chronicle_core::clock::Clock;

/// A clock pinned to one instant. Every action submitted under it carries
/// the same `submitted_at`, which keeps turn snapshots comparable across
/// runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Pins the clock to the top of the given hour (UTC). Panics on an
    /// invalid calendar date, which in a test is the right outcome.
    #[must_use]
    pub fn at(year: i32, month: u32, day: u32, hour: u32) -> Self {
        Self(Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
