//! Circular archive of overflow bins in the local store.

use eventdepot_core::{archive_record_name, Bin, ARCHIVE_RECORD_PREFIX};
use eventdepot_storage::{LocalStore, RecordStore};
use tracing::warn;

/// Slot arithmetic and record access for the archive ring.
///
/// The ring's bounds live in the depot state; this type only knows the
/// capacity and how slots map to records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Archive {
    capacity: usize,
}

impl Archive {
    /// A ring with `capacity` slots. At least two slots are needed so one
    /// can stay free.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(2),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The slot after `slot`, wrapping around.
    pub fn advance(&self, slot: usize) -> usize {
        (slot + 1) % self.capacity
    }

    /// Reduce a possibly out-of-range index into the ring.
    pub fn wrap(&self, slot: usize) -> usize {
        slot % self.capacity
    }

    pub fn load(&self, store: &dyn LocalStore, slot: usize) -> Option<Bin> {
        store.load_record(&archive_record_name(slot), false)
    }

    pub fn write(&self, store: &dyn LocalStore, slot: usize, bin: &Bin) -> bool {
        store.save_record(&archive_record_name(slot), bin)
    }

    pub fn discard(&self, store: &dyn LocalStore, slot: usize) {
        store.delete_record(&archive_record_name(slot));
    }

    /// Remove every archived record, whatever its slot.
    pub fn purge(&self, store: &dyn LocalStore) -> usize {
        let purged = store.purge_prefix(ARCHIVE_RECORD_PREFIX);
        if purged > 0 {
            warn!(purged, "Removed stale archived bins");
        }
        purged
    }
}
