// eventdepot-core - Data model shared by every depot crate
//
// Events, bins, the durable depot snapshot, error codes, and the collector
// wire format. No I/O, no threads.

pub mod bins;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod payload;
pub mod state;

// Re-export commonly used types
pub use bins::Bin;
pub use diagnostics::{inspect_response, log_response, ResponseVerdict};
pub use error::{DepotError, ErrorCode};
pub use event::Event;
pub use payload::{encode_payload, send_timestamp};
pub use state::DepotState;

/// Maximum number of events held in a single bin.
pub const DEFAULT_MAX_EVENTS_PER_BIN: usize = 50;

/// Slots in the circular archive. One slot always stays free, so 201 slots
/// hold at most 200 archived bins.
pub const DEFAULT_ARCHIVE_SLOTS: usize = 201;

/// Durable record name of the depot snapshot.
pub const STATE_RECORD_NAME: &str = "eventdepot_depotState";

/// Durable record name prefix of archived bins; the slot index is appended.
pub const ARCHIVE_RECORD_PREFIX: &str = "eventdepot_binArchive";

/// Record name for an archive slot.
pub fn archive_record_name(slot: usize) -> String {
    format!("{}{}", ARCHIVE_RECORD_PREFIX, slot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_record_name() {
        assert_eq!(archive_record_name(0), "eventdepot_binArchive0");
        assert_eq!(archive_record_name(200), "eventdepot_binArchive200");
        assert!(archive_record_name(17).starts_with(ARCHIVE_RECORD_PREFIX));
    }
}
