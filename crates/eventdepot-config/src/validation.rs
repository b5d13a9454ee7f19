// Configuration validation
//
// Validates that required fields are present and values are sensible

use super::*;
use anyhow::{bail, Result};
use tracing::warn;

pub fn validate_config(config: &RuntimeConfig) -> Result<()> {
    validate_collector_config(&config.collector)?;
    validate_depot_config(&config.depot)?;

    if config.storage.path.is_empty() {
        bail!(
            "Storage path is required\n\n\
            How to fix:\n\
              • Environment: export {}STORAGE_PATH=/var/lib/eventdepot\n\
              • TOML: [storage]\n              path = \"/var/lib/eventdepot\"",
            ENV_PREFIX
        );
    }

    Ok(())
}

fn validate_collector_config(config: &CollectorConfig) -> Result<()> {
    if config.host.is_empty() {
        bail!(
            "Collector host is required\n\n\
            How to fix:\n\
              • Environment: export {}COLLECTOR_HOST=https://collector.example\n\
              • TOML: [collector]\n              host = \"https://collector.example\"",
            ENV_PREFIX
        );
    }

    if config.request_timeout_ms == 0 {
        bail!("collector.request_timeout_ms must be greater than 0");
    }

    Ok(())
}

fn validate_depot_config(config: &DepotConfig) -> Result<()> {
    if config.max_events_per_bin == 0 {
        bail!("depot.max_events_per_bin must be greater than 0");
    }

    // One slot always stays free to tell a full buffer from an empty one
    if config.archive_slots < 2 {
        bail!("depot.archive_slots must be at least 2");
    }

    if config.min_send_period_ms == 0 {
        bail!("depot.min_send_period_ms must be greater than 0");
    }

    if config.min_send_period_ms > config.max_send_period_ms {
        bail!(
            "depot.min_send_period_ms ({}) must not exceed depot.max_send_period_ms ({})",
            config.min_send_period_ms,
            config.max_send_period_ms
        );
    }

    if config.max_events_per_bin > 10_000 {
        warn!(
            max_events_per_bin = config.max_events_per_bin,
            "depot.max_events_per_bin is very large; bins are held in memory"
        );
    }

    Ok(())
}
