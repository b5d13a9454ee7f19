//! Producer-facing depot handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::RecvTimeoutError;
use eventdepot_config::{CollectorConfig, RuntimeConfig};
use eventdepot_core::{DepotError, DepotState, Event};
use eventdepot_storage::{FsStore, LocalStore};
use eventdepot_transport::{HttpTransport, Transport};
use metrics::counter;
use once_cell::sync::OnceCell;
use tracing::{info, warn};

use crate::executor::{Job, JobExecutor};
use crate::{DepotContext, DepotOptions, FlushScheduler};

/// Whether a pause finished persisting before its drain bound elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseOutcome {
    Persisted,
    /// The pause job is still queued or running; it will persist when it
    /// runs, unless the process dies first.
    TimedOut,
}

struct Running {
    executor: JobExecutor,
    scheduler: FlushScheduler,
    sending_enabled: Arc<AtomicBool>,
}

/// Handle to an event depot.
///
/// Every method is non-blocking for producers except `pause` (bounded by
/// the drain timeout), `snapshot`, and `shutdown`.
pub struct EventDepot {
    store: Arc<dyn LocalStore>,
    transport: Arc<dyn Transport>,
    options: DepotOptions,
    running: OnceCell<Running>,
}

impl EventDepot {
    pub fn new(
        store: Arc<dyn LocalStore>,
        transport: Arc<dyn Transport>,
        options: DepotOptions,
    ) -> Self {
        Self {
            store,
            transport,
            options,
            running: OnceCell::new(),
        }
    }

    /// Depot backed by a filesystem store and the HTTP transport.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self> {
        let store = FsStore::open(&config.storage.path).with_context(|| {
            format!("Failed to open depot storage at '{}'", config.storage.path)
        })?;
        let transport = HttpTransport::new().context("Failed to build HTTP transport")?;
        Ok(Self::new(
            Arc::new(store),
            Arc::new(transport),
            DepotOptions::from(&config.depot),
        ))
    }

    /// Start the worker and flush timer, and queue the init job. Calling it
    /// again once initialized does nothing.
    pub fn init(&self, collector: &CollectorConfig) -> Result<(), DepotError> {
        self.running
            .get_or_try_init(|| self.start(collector))
            .map(|_| ())
    }

    /// `init` with the default collector path.
    pub fn init_with(
        &self,
        host: &str,
        query_params: &str,
        request_timeout_ms: u64,
    ) -> Result<(), DepotError> {
        self.init(&CollectorConfig {
            host: host.to_string(),
            query_params: query_params.to_string(),
            request_timeout_ms,
            ..CollectorConfig::default()
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.running.get().is_some()
    }

    pub fn options(&self) -> &DepotOptions {
        &self.options
    }

    /// Queue an event. Never blocks.
    pub fn store(&self, event: Event) -> Result<(), DepotError> {
        let running = self.running()?;
        running.executor.submit(Job::Store(event))?;
        counter!("eventdepot.events.stored").increment(1);
        Ok(())
    }

    /// Queue a processing cycle outside the timer.
    pub fn process_bins(&self) -> Result<(), DepotError> {
        self.running()?.executor.submit(Job::ProcessBins)
    }

    /// Disable sending, stop the timer, and persist the state, waiting at
    /// most the drain timeout for the queue to reach the pause.
    pub fn pause(&self) -> Result<PauseOutcome, DepotError> {
        let running = self.running()?;
        running.sending_enabled.store(false, Ordering::SeqCst);
        running.scheduler.suspend();

        let (done, persisted) = crossbeam_channel::bounded(1);
        running.executor.submit(Job::Pause { done })?;

        match persisted.recv_timeout(self.options.pause_drain_timeout) {
            Ok(()) => Ok(PauseOutcome::Persisted),
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    timeout_ms = self.options.pause_drain_timeout.as_millis() as u64,
                    "Pause did not complete before the drain timeout"
                );
                Ok(PauseOutcome::TimedOut)
            }
            Err(RecvTimeoutError::Disconnected) => Err(DepotError::WorkerStopped),
        }
    }

    /// Reload the persisted state and restart sending and the timer.
    pub fn resume(&self) -> Result<(), DepotError> {
        let running = self.running()?;
        running.executor.submit(Job::Resume)?;
        running.sending_enabled.store(true, Ordering::SeqCst);
        running.scheduler.resume();
        Ok(())
    }

    /// Copy of the worker's in-memory state once every job queued before
    /// this call has run.
    pub fn snapshot(&self) -> Result<DepotState, DepotError> {
        let running = self.running()?;
        let (respond, state) = crossbeam_channel::bounded(1);
        running.executor.submit(Job::Snapshot { respond })?;
        state.recv().map_err(|_| DepotError::WorkerStopped)
    }

    /// `snapshot` with a bound on the wait.
    pub fn snapshot_timeout(&self, timeout: Duration) -> Result<Option<DepotState>, DepotError> {
        let running = self.running()?;
        let (respond, state) = crossbeam_channel::bounded(1);
        running.executor.submit(Job::Snapshot { respond })?;
        match state.recv_timeout(timeout) {
            Ok(state) => Ok(Some(state)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(DepotError::WorkerStopped),
        }
    }

    /// Stop the timer, run everything already queued, and join the worker.
    /// Later calls fail with `WorkerStopped`.
    pub fn shutdown(&self) {
        if let Some(running) = self.running.get() {
            running.scheduler.shutdown();
            running.executor.shutdown();
            info!("Event depot shut down");
        }
    }

    fn running(&self) -> Result<&Running, DepotError> {
        self.running.get().ok_or(DepotError::NotInitialized)
    }

    fn start(&self, collector: &CollectorConfig) -> Result<Running, DepotError> {
        let destination = collector.destination();
        let context = DepotContext::new(
            destination.clone(),
            collector.request_timeout(),
            &self.options,
            Arc::clone(&self.store),
            Arc::clone(&self.transport),
        );
        let throttle = context.throttle();
        let sending_enabled = context.sending_flag();

        let executor = JobExecutor::spawn(context)?;
        executor.submit(Job::Init)?;

        let jobs = executor.sender();
        let scheduler =
            FlushScheduler::spawn(throttle, move || jobs.send(Job::ProcessBins).is_ok())?;

        info!(destination = %destination, "Event depot initialized");
        Ok(Running {
            executor,
            scheduler,
            sending_enabled,
        })
    }
}
