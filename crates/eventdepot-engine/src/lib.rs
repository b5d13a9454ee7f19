// eventdepot-engine - Ordered, persistent delivery of event bins
//
// A single worker thread owns the depot state and runs every job in FIFO
// order. A scheduler thread submits periodic processing at the adaptive send
// period; the `EventDepot` handle is the only producer-facing surface.

mod archive;
mod context;
mod depot;
mod executor;
mod options;
mod scheduler;
mod throttle;

pub use archive::Archive;
pub use context::DepotContext;
pub use depot::{EventDepot, PauseOutcome};
pub use options::DepotOptions;
pub use scheduler::FlushScheduler;
pub use throttle::{decay, grow, SendThrottle, FAILURE_PENALTY_MS, MIN_DECAY_STEP_MS};
