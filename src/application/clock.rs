//! Time source shared by every timer and timestamp in the application layer.
//!
//! Timestamps are derived from [`tokio::time::Instant`], so a paused tokio
//! runtime drives heartbeats, reaper sweeps, position monitors and event
//! timestamps together when tests call `tokio::time::advance`.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Wall-clock milliseconds anchored to a tokio instant.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    origin_ms: i64,
    start: Instant,
}

impl Clock {
    /// Clock anchored to the current UTC time.
    #[must_use]
    pub fn system() -> Self {
        Self::starting_at(chrono::Utc::now().timestamp_millis())
    }

    /// Clock that reads `origin_ms` now and advances with tokio time.
    #[must_use]
    pub fn starting_at(origin_ms: i64) -> Self {
        Self {
            origin_ms,
            start: Instant::now(),
        }
    }

    /// Current time in epoch milliseconds.
    #[must_use]
    pub fn now_ms(&self) -> i64 {
        let elapsed = i64::try_from(self.start.elapsed().as_millis()).unwrap_or(i64::MAX);
        self.origin_ms.saturating_add(elapsed)
    }

    /// Interval whose first tick fires one `period` from now.
    ///
    /// Missed ticks are delayed rather than bursted.
    #[must_use]
    pub fn ticker(&self, period: Duration) -> Interval {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}
