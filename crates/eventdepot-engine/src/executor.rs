//! Single-threaded FIFO job execution.

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use eventdepot_core::{DepotError, DepotState, Event};
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::DepotContext;

/// Units of work for the depot worker.
pub(crate) enum Job {
    Init,
    Store(Event),
    ProcessBins,
    /// Signals `done` once the state is persisted
    Pause { done: Sender<()> },
    Resume,
    Snapshot { respond: Sender<DepotState> },
    /// Stop the worker after everything queued before it
    Shutdown,
}

impl Job {
    fn name(&self) -> &'static str {
        match self {
            Job::Init => "init",
            Job::Store(_) => "store",
            Job::ProcessBins => "process_bins",
            Job::Pause { .. } => "pause",
            Job::Resume => "resume",
            Job::Snapshot { .. } => "snapshot",
            Job::Shutdown => "shutdown",
        }
    }
}

/// Owns the worker thread and the sending side of its queue.
pub(crate) struct JobExecutor {
    jobs: Sender<Job>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl JobExecutor {
    pub(crate) fn spawn(context: DepotContext) -> Result<Self, DepotError> {
        let (jobs, queue) = crossbeam_channel::unbounded();
        let worker = thread::Builder::new()
            .name("eventdepot-worker".to_string())
            .spawn(move || run_worker(context, queue))?;

        Ok(Self {
            jobs,
            worker: Mutex::new(Some(worker)),
        })
    }

    pub(crate) fn sender(&self) -> Sender<Job> {
        self.jobs.clone()
    }

    /// Enqueue a job without waiting for it.
    pub(crate) fn submit(&self, job: Job) -> Result<(), DepotError> {
        self.jobs.send(job).map_err(|_| DepotError::WorkerStopped)
    }

    /// Let the queue drain, then join the worker.
    pub(crate) fn shutdown(&self) {
        let _ = self.jobs.send(Job::Shutdown);
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                error!("Event depot worker exited abnormally");
            }
        }
    }
}

fn run_worker(mut context: DepotContext, queue: Receiver<Job>) {
    debug!("Event depot worker started");
    for job in queue.iter() {
        if matches!(job, Job::Shutdown) {
            break;
        }
        let name = job.name();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| execute(&mut context, job)));
        if outcome.is_err() {
            error!(job = name, "Event depot job panicked; worker continues");
        }
    }
    debug!("Event depot worker stopped");
}

fn execute(context: &mut DepotContext, job: Job) {
    match job {
        Job::Init => context.init(),
        Job::Store(event) => context.store_event(event),
        Job::ProcessBins => context.process_bins(false),
        Job::Pause { done } => {
            context.pause();
            // The caller may have stopped waiting
            let _ = done.send(());
        }
        Job::Resume => context.resume(),
        Job::Snapshot { respond } => {
            let _ = respond.send(context.snapshot());
        }
        Job::Shutdown => {}
    }
}
