//! Time sources for debounce timing.
//!
//! Debounce decisions compare elapsed real time, not tick counts, so a late
//! tick still sees the correct duration. The default clock is anchored to
//! `tokio::time::Instant`, which keeps it monotonic and lets tests drive it
//! with paused tokio time.

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Source of "now" for the engine.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock anchored, monotonic clock.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin_instant: tokio::time::Instant,
    origin_utc: DateTime<Utc>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin_instant: tokio::time::Instant::now(),
            origin_utc: Utc::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = self.origin_instant.elapsed();
        self.origin_utc
            + chrono::Duration::from_std(elapsed).unwrap_or_else(|_| chrono::Duration::zero())
    }
}

/// Shared handle to a clock.
pub type SharedClock = Arc<dyn Clock>;

/// Clock that only moves when told to.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<std::sync::Mutex<DateTime<Utc>>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(std::sync::Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: std::time::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::from_std(by).unwrap();
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap() = to;
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
