use super::{LogFormat, RuntimeConfig};
use anyhow::{anyhow, Context, Result};

pub const ENV_PREFIX: &str = "EVENTDEPOT_";

/// Abstraction over environment-variable lookups so tests and embedding hosts
/// can supply their own source of overrides.
///
/// Keys are passed without the `EVENTDEPOT_` prefix.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority) to the runtime config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut RuntimeConfig, env: &E) -> Result<()> {
    // Collector
    if let Some(host) = env.get("COLLECTOR_HOST") {
        config.collector.host = host;
    }
    if let Some(path) = env.get("COLLECTOR_PATH") {
        config.collector.path = path;
    }
    if let Some(query) = env.get("QUERY_PARAMS") {
        config.collector.query_params = query;
    }
    if let Some(val) = get_env_u64(env, "REQUEST_TIMEOUT_MS")? {
        config.collector.request_timeout_ms = val;
    }

    // Depot limits
    if let Some(val) = get_env_usize(env, "MAX_EVENTS_PER_BIN")? {
        config.depot.max_events_per_bin = val;
    }
    if let Some(val) = get_env_usize(env, "ARCHIVE_SLOTS")? {
        config.depot.archive_slots = val;
    }
    if let Some(val) = get_env_u64(env, "MIN_SEND_PERIOD_MS")? {
        config.depot.min_send_period_ms = val;
    }
    if let Some(val) = get_env_u64(env, "MAX_SEND_PERIOD_MS")? {
        config.depot.max_send_period_ms = val;
    }
    if let Some(val) = get_env_u64(env, "PAUSE_DRAIN_TIMEOUT_MS")? {
        config.depot.pause_drain_timeout_ms = val;
    }

    // Storage
    if let Some(path) = env.get("STORAGE_PATH") {
        config.storage.path = path;
    }

    // Logging
    if let Some(level) = env.get("LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(format) = env.get("LOG_FORMAT") {
        config.logging.format = format
            .parse::<LogFormat>()
            .context("Invalid EVENTDEPOT_LOG_FORMAT value")?;
    }

    Ok(())
}

fn get_env_usize<E: EnvSource>(env: &E, key: &str) -> Result<Option<usize>> {
    match env.get(key) {
        Some(val) => {
            let parsed = val
                .parse::<usize>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn get_env_u64<E: EnvSource>(env: &E, key: &str) -> Result<Option<u64>> {
    match env.get(key) {
        Some(val) => {
            let parsed = val
                .parse::<u64>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}
