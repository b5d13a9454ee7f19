//! Worker-owned depot state and the bin processor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use eventdepot_core::{
    encode_payload, log_response, send_timestamp, Bin, DepotState, Event, STATE_RECORD_NAME,
};
use eventdepot_storage::{LocalStore, RecordStore};
use eventdepot_transport::Transport;
use metrics::counter;
use tracing::{debug, error, info, warn};

use crate::{Archive, DepotOptions, SendThrottle};

/// Everything one depot worker mutates.
///
/// Only the worker thread touches a context, so none of its methods lock.
/// The throttle and the sending flag are shared with the handle and the
/// flush scheduler through atomics.
pub struct DepotContext {
    state: DepotState,
    destination: String,
    request_timeout: Duration,
    max_events_per_bin: usize,
    archive: Archive,
    paused: bool,
    store: Arc<dyn LocalStore>,
    transport: Arc<dyn Transport>,
    throttle: Arc<SendThrottle>,
    sending_enabled: Arc<AtomicBool>,
}

impl DepotContext {
    pub fn new(
        destination: impl Into<String>,
        request_timeout: Duration,
        options: &DepotOptions,
        store: Arc<dyn LocalStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let destination = destination.into();
        Self {
            state: DepotState::new(&destination),
            destination,
            request_timeout,
            max_events_per_bin: options.max_events_per_bin.max(1),
            archive: Archive::new(options.archive_slots),
            paused: false,
            store,
            transport,
            throttle: Arc::new(SendThrottle::new(
                options.min_send_period,
                options.max_send_period,
            )),
            sending_enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn throttle(&self) -> Arc<SendThrottle> {
        Arc::clone(&self.throttle)
    }

    /// Flag that gates every send. Cleared by the handle when a pause
    /// starts so queued jobs drain without touching the network.
    pub fn sending_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.sending_enabled)
    }

    pub fn state(&self) -> &DepotState {
        &self.state
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Restore persisted state and run the first processing cycle.
    ///
    /// If the collector destination changed since the state was saved, the
    /// holding bin is flushed into the archive under its old destination
    /// before it is retargeted.
    pub fn init(&mut self) {
        self.restore();

        let flush_holding = self.state.holding_bin.destination != self.destination;
        if flush_holding {
            info!(
                previous = %self.state.holding_bin.destination,
                current = %self.destination,
                held = self.state.holding_bin.len(),
                "Collector destination changed; archiving held events"
            );
        }

        self.process_bins(flush_holding);
        self.state.holding_bin.destination = self.destination.clone();
    }

    pub fn store_event(&mut self, event: Event) {
        if self.paused {
            // Nothing stays in memory while paused
            self.restore();
            self.state.holding_bin.push(event);
            self.process_bins(false);
            self.persist();
        } else {
            self.state.holding_bin.push(event);
            if self.state.holding_bin.len() >= self.max_events_per_bin {
                self.process_bins(false);
            }
        }
    }

    /// One processing cycle: at most one send, then overflow rotation.
    pub fn process_bins(&mut self, flush_holding: bool) {
        debug!(
            resend = self.state.resend_bin.len(),
            holding = self.state.holding_bin.len(),
            archive_start = self.state.archive_start,
            archive_end = self.state.archive_end,
            "Processing bins"
        );

        if !self.state.resend_bin.is_empty() {
            if self.send_bin(&self.state.resend_bin) {
                self.state.resend_bin.clear();
            }
        } else if !self.state.archive_is_empty() {
            self.send_oldest_archived();
        } else if !self.state.holding_bin.is_empty() {
            if !self.send_bin(&self.state.holding_bin) {
                let held = self.state.holding_bin.take_front(usize::MAX);
                self.state.resend_bin.absorb(held);
            }
            self.state.holding_bin.clear();
        }

        while self.state.holding_bin.len() >= self.max_events_per_bin
            || (flush_holding && !self.state.holding_bin.is_empty())
        {
            let bin = self.state.holding_bin.take_front(self.max_events_per_bin);
            self.rotate_into_archive(bin);
        }
    }

    pub fn pause(&mut self) {
        if self.paused {
            return;
        }
        self.persist();
        self.paused = true;
        info!("Event depot paused");
    }

    pub fn resume(&mut self) {
        if !self.paused {
            return;
        }
        self.restore();
        self.throttle.reset();
        self.paused = false;
        info!("Event depot resumed");
    }

    pub fn snapshot(&self) -> DepotState {
        self.state.clone()
    }

    fn send_oldest_archived(&mut self) {
        let slot = self.state.archive_start;
        match self.archive.load(self.store.as_ref(), slot) {
            Some(bin) => {
                if !self.send_bin(&bin) {
                    self.state.resend_bin.absorb(bin);
                }
            }
            None => warn!(slot, "Archived bin could not be loaded; skipping"),
        }

        self.archive.discard(self.store.as_ref(), slot);
        self.state.archive_start = self.archive.advance(slot);
    }

    fn rotate_into_archive(&mut self, bin: Bin) {
        let slot = self.state.archive_end;
        self.state.archive_end = self.archive.advance(slot);

        if self.state.archive_end == self.state.archive_start {
            let oldest = self.state.archive_start;
            self.archive.discard(self.store.as_ref(), oldest);
            self.state.archive_start = self.archive.advance(oldest);
            counter!("eventdepot.archive.evicted").increment(1);
            warn!(slot = oldest, "Archive full; dropped oldest archived bin");
        }

        if self.archive.write(self.store.as_ref(), slot, &bin) {
            debug!(slot, events = bin.len(), "Rotated bin into archive");
        } else {
            error!(slot, events = bin.len(), "Failed to archive bin; events lost");
        }
        counter!("eventdepot.archive.rotated").increment(1);
    }

    fn send_bin(&self, bin: &Bin) -> bool {
        if !self.sending_enabled.load(Ordering::SeqCst) {
            debug!(events = bin.len(), "Sending disabled; bin deferred");
            return false;
        }

        let body = match encode_payload(send_timestamp(), &bin.events) {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "Failed to encode bin payload");
                return false;
            }
        };

        match self
            .transport
            .send(&bin.destination, self.request_timeout, &body)
        {
            Ok(response) => {
                let period_ms = self.throttle.on_response();
                counter!("eventdepot.bins.sent").increment(1);
                debug!(events = bin.len(), period_ms, "Bin delivered");
                log_response(&response);
                true
            }
            Err(e) => {
                let period_ms = self.throttle.on_failure();
                counter!("eventdepot.bins.failed").increment(1);
                warn!(
                    error = %e,
                    code = %e.code(),
                    destination = %bin.destination,
                    events = bin.len(),
                    period_ms,
                    "Failed to send bin"
                );
                false
            }
        }
    }

    /// Load and consume the persisted state, falling back to a fresh one.
    fn restore(&mut self) {
        let mut state = self
            .store
            .load_record::<DepotState>(STATE_RECORD_NAME, true)
            .unwrap_or_else(|| DepotState::new(&self.destination));

        state.archive_start = self.archive.wrap(state.archive_start);
        state.archive_end = self.archive.wrap(state.archive_end);
        if state.archive_is_empty() {
            self.archive.purge(self.store.as_ref());
        }

        self.state = state;
    }

    /// Save the state and drop the in-memory copy.
    fn persist(&mut self) {
        self.store.save_record(STATE_RECORD_NAME, &self.state);
        self.state = DepotState::new(&self.destination);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventdepot_storage::MemoryStore;
    use eventdepot_transport::TransportError;
    use parking_lot::Mutex;

    /// Fails every send and counts attempts.
    #[derive(Default)]
    struct Offline {
        attempts: Mutex<usize>,
    }

    impl Transport for Offline {
        fn send(&self, _: &str, _: Duration, _: &str) -> Result<String, TransportError> {
            *self.attempts.lock() += 1;
            Err(TransportError::Generic("network unreachable".into()))
        }
    }

    /// Accepts every send and keeps the bodies.
    #[derive(Default)]
    struct Online {
        bodies: Mutex<Vec<(String, String)>>,
    }

    impl Transport for Online {
        fn send(&self, destination: &str, _: Duration, body: &str) -> Result<String, TransportError> {
            self.bodies
                .lock()
                .push((destination.to_string(), body.to_string()));
            Ok(r#"{"error":0,"data":{"datacollector_batch":{"error":0}}}"#.to_string())
        }
    }

    const DEST: &str = "https://collector.test/batch";

    fn context(store: &MemoryStore, transport: Arc<dyn Transport>) -> DepotContext {
        DepotContext::new(
            DEST,
            Duration::from_millis(100),
            &DepotOptions::default(),
            Arc::new(store.clone()),
            transport,
        )
    }

    fn event(seq: i64) -> Event {
        Event::new().with("seq", seq)
    }

    #[test]
    fn test_holding_flush_failure_moves_events_to_resend() {
        let store = MemoryStore::new();
        let mut ctx = context(&store, Arc::new(Offline::default()));
        for i in 0..5 {
            ctx.store_event(event(i));
        }

        ctx.process_bins(false);

        assert_eq!(ctx.state().resend_bin.len(), 5);
        assert!(ctx.state().holding_bin.is_empty());
        assert!(ctx.state().archive_is_empty());
    }

    #[test]
    fn test_holding_delivery_clears_holding() {
        let store = MemoryStore::new();
        let online = Arc::new(Online::default());
        let mut ctx = context(&store, online.clone());
        ctx.store_event(event(1));
        ctx.store_event(event(2));

        ctx.process_bins(false);

        assert!(ctx.state().holding_bin.is_empty());
        assert!(ctx.state().resend_bin.is_empty());
        let bodies = online.bodies.lock();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0].0, DEST);
        assert!(bodies[0].1.ends_with(r#"[{"seq":1},{"seq":2}]]"#));
    }

    #[test]
    fn test_disabled_sending_skips_transport() {
        let store = MemoryStore::new();
        let offline = Arc::new(Offline::default());
        let mut ctx = context(&store, offline.clone());
        ctx.sending_flag().store(false, Ordering::SeqCst);
        ctx.store_event(event(1));

        ctx.process_bins(false);

        assert_eq!(*offline.attempts.lock(), 0);
        assert_eq!(ctx.state().resend_bin.len(), 1);
        // A skipped send does not count as a transport failure
        assert_eq!(ctx.throttle().period_ms(), 5_000);
    }

    #[test]
    fn test_failed_send_slows_throttle() {
        let store = MemoryStore::new();
        let mut ctx = context(&store, Arc::new(Offline::default()));
        ctx.store_event(event(1));
        ctx.process_bins(false);
        ctx.process_bins(false);
        assert_eq!(ctx.throttle().period_ms(), 6_000);
    }

    #[test]
    fn test_pause_persists_and_resets_memory() {
        let store = MemoryStore::new();
        let mut ctx = context(&store, Arc::new(Offline::default()));
        ctx.store_event(event(1));

        ctx.pause();
        assert!(ctx.is_paused());
        assert!(store.contains(STATE_RECORD_NAME));
        assert_eq!(ctx.snapshot(), DepotState::new(DEST));

        // Second pause must not overwrite the record with the empty copy
        ctx.pause();
        ctx.resume();
        assert!(!ctx.is_paused());
        assert_eq!(ctx.state().holding_bin.len(), 1);
        assert!(!store.contains(STATE_RECORD_NAME));
    }

    #[test]
    fn test_resume_when_running_is_noop() {
        let store = MemoryStore::new();
        let mut ctx = context(&store, Arc::new(Offline::default()));
        ctx.store_event(event(1));
        ctx.resume();
        assert_eq!(ctx.state().holding_bin.len(), 1);
    }

    #[test]
    fn test_store_while_paused_round_trips_through_storage() {
        let store = MemoryStore::new();
        let mut ctx = context(&store, Arc::new(Offline::default()));
        ctx.pause();
        ctx.sending_flag().store(false, Ordering::SeqCst);

        ctx.store_event(event(7));

        assert_eq!(ctx.snapshot(), DepotState::new(DEST));
        let saved: DepotState = store.load_record(STATE_RECORD_NAME, false).unwrap();
        // The paused cycle could not send, so the event moved to resend
        assert_eq!(saved.resend_bin.len(), 1);
        assert!(saved.holding_bin.is_empty());
    }
}
