//! Adaptive send period.
//!
//! Responses speed the flush timer back up towards the minimum period;
//! transport failures slow it down towards the maximum.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use metrics::gauge;

/// Added to the period after each transport failure.
pub const FAILURE_PENALTY_MS: u64 = 500;

/// Smallest decrease applied after a response.
pub const MIN_DECAY_STEP_MS: u64 = 500;

/// Period after a response: a fifth of the distance to `min_ms`, at least
/// [`MIN_DECAY_STEP_MS`], never below `min_ms`.
pub fn decay(current_ms: u64, min_ms: u64) -> u64 {
    if current_ms <= min_ms {
        return min_ms;
    }
    let step = ((current_ms - min_ms) / 5).max(MIN_DECAY_STEP_MS);
    current_ms.saturating_sub(step).max(min_ms)
}

/// Period after a transport failure, capped at `max_ms`.
pub fn grow(current_ms: u64, max_ms: u64) -> u64 {
    current_ms.saturating_add(FAILURE_PENALTY_MS).min(max_ms)
}

/// The current send period, shared between the worker (writer) and the
/// flush scheduler (reader).
#[derive(Debug)]
pub struct SendThrottle {
    period_ms: AtomicU64,
    min_ms: u64,
    max_ms: u64,
}

impl SendThrottle {
    pub fn new(min: Duration, max: Duration) -> Self {
        let min_ms = min.as_millis() as u64;
        let max_ms = (max.as_millis() as u64).max(min_ms);
        Self {
            period_ms: AtomicU64::new(min_ms),
            min_ms,
            max_ms,
        }
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms())
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms.load(Ordering::Relaxed)
    }

    pub fn on_response(&self) -> u64 {
        self.set(decay(self.period_ms(), self.min_ms))
    }

    pub fn on_failure(&self) -> u64 {
        self.set(grow(self.period_ms(), self.max_ms))
    }

    pub fn reset(&self) -> u64 {
        self.set(self.min_ms)
    }

    fn set(&self, period_ms: u64) -> u64 {
        self.period_ms.store(period_ms, Ordering::Relaxed);
        gauge!("eventdepot.send_period_ms").set(period_ms as f64);
        period_ms
    }
}
