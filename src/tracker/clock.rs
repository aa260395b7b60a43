use chrono::Utc;
use tokio::time::Instant;

/// Wall-clock time source in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Epoch reading taken once, advanced by the tokio monotonic clock.
///
/// Stays consistent with tokio timers, including when the runtime clock is
/// paused in tests.
pub struct MonotonicClock {
    epoch_millis: i64,
    anchor: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::anchored_at(Utc::now().timestamp_millis())
    }

    pub fn anchored_at(epoch_millis: i64) -> Self {
        Self {
            epoch_millis,
            anchor: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_millis(&self) -> i64 {
        self.epoch_millis + self.anchor.elapsed().as_millis() as i64
    }
}
