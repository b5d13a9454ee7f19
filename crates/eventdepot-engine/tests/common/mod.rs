#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use eventdepot_core::{archive_record_name, Bin, DepotState, Event, STATE_RECORD_NAME};
use eventdepot_engine::DepotContext;
use eventdepot_storage::{MemoryStore, RecordStore};
use eventdepot_transport::{Transport, TransportError};
use parking_lot::Mutex;

pub const DEST: &str = "https://collector.test/isos-personalization/ws/interface/datacollector_batch";

pub const ACCEPTED: &str = r#"{"error":0,"data":{"datacollector_batch":{"error":0}}}"#;

/// One successfully delivered bin.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub destination: String,
    pub events: Vec<Event>,
}

/// In-process collector whose connectivity can be toggled.
#[derive(Default)]
pub struct ScriptedTransport {
    online: AtomicBool,
    panic_next: AtomicBool,
    attempts: AtomicUsize,
    delivered: Mutex<Vec<Delivery>>,
}

impl ScriptedTransport {
    pub fn online() -> Arc<Self> {
        let transport = Self::default();
        transport.online.store(true, Ordering::SeqCst);
        Arc::new(transport)
    }

    pub fn offline() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Panic inside the next send.
    pub fn panic_next(&self) {
        self.panic_next.store(true, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.delivered.lock().clone()
    }

    pub fn delivered_seqs(&self) -> Vec<i64> {
        self.delivered
            .lock()
            .iter()
            .flat_map(|d| d.events.iter().map(seq_of))
            .collect()
    }
}

impl Transport for ScriptedTransport {
    fn send(
        &self,
        destination: &str,
        _timeout: Duration,
        body: &str,
    ) -> Result<String, TransportError> {
        if self.panic_next.swap(false, Ordering::SeqCst) {
            panic!("scripted transport panic");
        }
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.online.load(Ordering::SeqCst) {
            return Err(TransportError::Generic("network unreachable".into()));
        }

        let (_, events): (f64, Vec<Event>) =
            serde_json::from_str(body).map_err(|e| TransportError::InvalidArgs(e.to_string()))?;
        self.delivered.lock().push(Delivery {
            destination: destination.to_string(),
            events,
        });
        Ok(ACCEPTED.to_string())
    }
}

pub fn event(seq: i64) -> Event {
    Event::new().with("seq", seq).with("name", "purchase")
}

pub fn seq_of(event: &Event) -> i64 {
    event.get("seq").and_then(|v| v.as_i64()).unwrap()
}

pub fn seqs(bin: &Bin) -> Vec<i64> {
    bin.events.iter().map(seq_of).collect()
}

pub fn bin_of(destination: &str, range: std::ops::Range<i64>) -> Bin {
    let mut bin = Bin::new(destination);
    for seq in range {
        bin.push(event(seq));
    }
    bin
}

/// Persist `state` and the given archived bins as if a previous run had
/// paused with them.
pub fn seed(store: &MemoryStore, state: &DepotState, archived: &[(usize, Bin)]) {
    assert!(store.save_record(STATE_RECORD_NAME, state));
    for (slot, bin) in archived {
        assert!(store.save_record(&archive_record_name(*slot), bin));
    }
}

/// Run processing cycles until every bin is empty.
pub fn drain(ctx: &mut DepotContext) {
    for _ in 0..10_000 {
        let state = ctx.state();
        if state.resend_bin.is_empty() && state.holding_bin.is_empty() && state.archive_is_empty()
        {
            return;
        }
        ctx.process_bins(false);
    }
    panic!("depot did not drain");
}
