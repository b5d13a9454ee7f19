use std::time::Duration;

use eventdepot_config::DepotConfig;
use eventdepot_core::{DEFAULT_ARCHIVE_SLOTS, DEFAULT_MAX_EVENTS_PER_BIN};

/// Batching, archive, and throttling limits for one depot.
#[derive(Debug, Clone, PartialEq)]
pub struct DepotOptions {
    pub max_events_per_bin: usize,
    pub archive_slots: usize,
    pub min_send_period: Duration,
    pub max_send_period: Duration,
    /// How long `pause` waits for the queue to drain
    pub pause_drain_timeout: Duration,
}

impl Default for DepotOptions {
    fn default() -> Self {
        Self {
            max_events_per_bin: DEFAULT_MAX_EVENTS_PER_BIN,
            archive_slots: DEFAULT_ARCHIVE_SLOTS,
            min_send_period: Duration::from_millis(5_000),
            max_send_period: Duration::from_millis(30_000),
            pause_drain_timeout: Duration::from_millis(2_000),
        }
    }
}

impl From<&DepotConfig> for DepotOptions {
    fn from(config: &DepotConfig) -> Self {
        Self {
            max_events_per_bin: config.max_events_per_bin,
            archive_slots: config.archive_slots,
            min_send_period: Duration::from_millis(config.min_send_period_ms),
            max_send_period: Duration::from_millis(config.max_send_period_ms),
            pause_drain_timeout: config.pause_drain_timeout(),
        }
    }
}
