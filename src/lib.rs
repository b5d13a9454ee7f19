// eventdepot - Client-side telemetry depot
//
// Re-exports the depot crates and provides the pieces shared by the CLI:
// tracing setup, NDJSON delivery, and inspection of persisted state.

use std::io::BufRead;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, warn};

pub use eventdepot_config::{LogConfig, LogFormat, RuntimeConfig};
pub use eventdepot_core::{Bin, DepotError, DepotState, ErrorCode, Event};
pub use eventdepot_engine::{DepotOptions, EventDepot, PauseOutcome};

use eventdepot_core::{ARCHIVE_RECORD_PREFIX, STATE_RECORD_NAME};
use eventdepot_storage::{FsStore, LocalStore};

/// Pause between drain polls while waiting for delivery.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Initialize tracing/logging from the logging section
pub fn init_tracing(config: &LogConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // Try to set the global subscriber; ignore error if already set (idempotent)
    let _ = match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().json().with_writer(std::io::stderr)),
        ),
        LogFormat::Text => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().with_writer(std::io::stderr)),
        ),
    };
}

/// Outcome of a `send` run.
#[derive(Debug, Clone, PartialEq)]
pub struct SendReport {
    pub stored: usize,
    /// Lines that were not JSON objects
    pub skipped: usize,
    /// Every bin was delivered before the wait ran out
    pub drained: bool,
    pub pause: PauseOutcome,
}

/// Store every newline-delimited JSON object from `input`, try to deliver
/// them for up to `wait`, then pause so anything left is persisted.
pub fn run_send<R: BufRead>(config: &RuntimeConfig, input: R, wait: Duration) -> Result<SendReport> {
    let depot = EventDepot::from_config(config)?;
    depot
        .init(&config.collector)
        .context("Failed to start event depot")?;

    let mut stored = 0;
    let mut skipped = 0;
    for (index, line) in input.lines().enumerate() {
        let line = line.context("Failed to read input")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event = serde_json::from_str::<Value>(line)
            .map_err(|e| e.to_string())
            .and_then(|value| {
                Event::try_from(value).map_err(|_| "not a JSON object".to_string())
            });
        match event {
            Ok(event) => {
                depot.store(event)?;
                stored += 1;
            }
            Err(reason) => {
                warn!(line = index + 1, reason = %reason, "Skipping input line");
                skipped += 1;
            }
        }
    }

    let drained = drain(&depot, wait)?;
    let pause = depot.pause()?;
    depot.shutdown();

    info!(stored, skipped, drained, ?pause, "Send finished");
    Ok(SendReport {
        stored,
        skipped,
        drained,
        pause,
    })
}

fn drain(depot: &EventDepot, wait: Duration) -> Result<bool> {
    let deadline = Instant::now() + wait;
    while Instant::now() < deadline {
        depot.process_bins()?;
        let remaining = deadline.saturating_duration_since(Instant::now());
        if let Some(state) = depot.snapshot_timeout(remaining)? {
            if is_empty(&state) {
                return Ok(true);
            }
        }
        thread::sleep(DRAIN_POLL_INTERVAL.min(deadline.saturating_duration_since(Instant::now())));
    }
    Ok(false)
}

fn is_empty(state: &DepotState) -> bool {
    state.resend_bin.is_empty() && state.holding_bin.is_empty() && state.archive_is_empty()
}

/// Summary of the persisted depot state, read without consuming it.
#[derive(Debug, Clone, PartialEq)]
pub struct InspectReport {
    pub state: Option<DepotState>,
    /// Archived bins according to the state's archive bounds
    pub archived_bins: usize,
    /// Archive records present in storage
    pub archive_records: usize,
}

pub fn run_inspect(config: &RuntimeConfig) -> Result<InspectReport> {
    inspect_store(
        &FsStore::open(&config.storage.path).with_context(|| {
            format!("Failed to open depot storage at '{}'", config.storage.path)
        })?,
        config.depot.archive_slots,
    )
}

pub fn inspect_store(store: &dyn LocalStore, archive_slots: usize) -> Result<InspectReport> {
    let state = match store.load(STATE_RECORD_NAME)? {
        Some(bytes) => Some(
            serde_json::from_slice::<DepotState>(&bytes)
                .context("Persisted depot state is not readable")?,
        ),
        None => None,
    };
    let archived_bins = state
        .as_ref()
        .map(|s| s.archived_bins(archive_slots))
        .unwrap_or(0);
    let archive_records = store.list_names(ARCHIVE_RECORD_PREFIX)?.len();

    Ok(InspectReport {
        state,
        archived_bins,
        archive_records,
    })
}

/// Read NDJSON from a file, or stdin when no path is given.
pub fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead>> {
    match path {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open input {}", path.display()))?;
            Ok(Box::new(std::io::BufReader::new(file)))
        }
        None => Ok(Box::new(std::io::BufReader::new(std::io::stdin()))),
    }
}
