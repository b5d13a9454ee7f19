//! JSON records on top of a [`LocalStore`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, warn};

use crate::{LocalStore, StorageError};

/// Typed record access with the depot's failure policy: nothing here ever
/// returns an error. Failures are logged where they happen and callers fall
/// back to a safe default.
pub trait RecordStore {
    /// Encode and persist `value`. Returns whether the record was written.
    fn save_record<T: Serialize>(&self, name: &str, value: &T) -> bool;

    /// Read and decode a record. Missing, unreadable, and undecodable records
    /// are all `None`. With `delete_after`, an existing record is removed
    /// whether or not it decoded.
    fn load_record<T: DeserializeOwned>(&self, name: &str, delete_after: bool) -> Option<T>;

    /// Remove a record, logging failures.
    fn delete_record(&self, name: &str);

    /// Remove every record whose name starts with `prefix`. Returns how many
    /// were removed.
    fn purge_prefix(&self, prefix: &str) -> usize;
}

impl<S: LocalStore + ?Sized> RecordStore for S {
    fn save_record<T: Serialize>(&self, name: &str, value: &T) -> bool {
        let blob = match serde_json::to_vec(value) {
            Ok(blob) => blob,
            Err(source) => {
                let err = StorageError::Encode {
                    name: name.to_string(),
                    source,
                };
                error!(error = %err, "Failed to encode record; keeping previous copy");
                return false;
            }
        };

        match self.save(name, &blob) {
            Ok(()) => true,
            Err(err) => {
                error!(error = %err, "Failed to save record; keeping previous copy");
                false
            }
        }
    }

    fn load_record<T: DeserializeOwned>(&self, name: &str, delete_after: bool) -> Option<T> {
        let blob = match self.load(name) {
            Ok(Some(blob)) => blob,
            Ok(None) => return None,
            Err(err) => {
                warn!(error = %err, "Failed to read record; treating as absent");
                return None;
            }
        };

        let decoded = match serde_json::from_slice(&blob) {
            Ok(value) => Some(value),
            Err(source) => {
                let err = StorageError::Decode {
                    name: name.to_string(),
                    source,
                };
                error!(error = %err, "Failed to decode record; treating as absent");
                None
            }
        };

        if delete_after {
            self.delete_record(name);
        }

        decoded
    }

    fn delete_record(&self, name: &str) {
        if let Err(err) = self.delete(name) {
            warn!(error = %err, "Failed to delete record");
        }
    }

    fn purge_prefix(&self, prefix: &str) -> usize {
        let names = match self.list_names(prefix) {
            Ok(names) => names,
            Err(err) => {
                warn!(error = %err, prefix, "Failed to list records for purge");
                return 0;
            }
        };

        let mut purged = 0;
        for name in names {
            match self.delete(&name) {
                Ok(()) => purged += 1,
                Err(err) => warn!(error = %err, "Failed to purge record"),
            }
        }
        purged
    }
}
