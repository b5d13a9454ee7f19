//! The durable depot snapshot.

use serde::{Deserialize, Serialize};

use crate::Bin;

/// Everything that must survive a process kill: the two in-memory bins and
/// the bounds of the circular archive.
///
/// `archive_start` is the oldest unconsumed slot and `archive_end` the next
/// free one; both are always reduced modulo the archive capacity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DepotState {
    pub resend_bin: Bin,
    pub holding_bin: Bin,
    pub archive_start: usize,
    pub archive_end: usize,
}

impl DepotState {
    /// Fresh state with both bins bound to `destination`.
    pub fn new(destination: &str) -> Self {
        Self {
            resend_bin: Bin::new(destination),
            holding_bin: Bin::new(destination),
            archive_start: 0,
            archive_end: 0,
        }
    }

    pub fn archive_is_empty(&self) -> bool {
        self.archive_start == self.archive_end
    }

    /// Number of archived bins between start and end for a buffer of
    /// `capacity` slots.
    pub fn archived_bins(&self, capacity: usize) -> usize {
        if capacity == 0 {
            return 0;
        }
        (self.archive_end + capacity - self.archive_start) % capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Event;

    #[test]
    fn test_new_state_is_empty() {
        let state = DepotState::new("https://collector/batch");
        assert!(state.resend_bin.is_empty());
        assert!(state.holding_bin.is_empty());
        assert!(state.archive_is_empty());
        assert_eq!(state.holding_bin.destination, "https://collector/batch");
        assert_eq!(state.resend_bin.destination, "https://collector/batch");
    }

    #[test]
    fn test_archived_bins_wraps() {
        let mut state = DepotState::new("d");
        state.archive_start = 199;
        state.archive_end = 2;
        assert_eq!(state.archived_bins(201), 4);

        state.archive_start = 5;
        state.archive_end = 5;
        assert_eq!(state.archived_bins(201), 0);
    }

    #[test]
    fn test_snapshot_survives_json() {
        let mut state = DepotState::new("https://a");
        state.holding_bin.push(Event::new().with("name", "purchase"));
        state.resend_bin.push(Event::new().with("name", "login"));
        state.archive_start = 3;
        state.archive_end = 9;

        let bytes = serde_json::to_vec(&state).unwrap();
        let restored: DepotState = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(restored, state);
    }
}
