//! Durable key/value persistence for depot state and archived bins.
//!
//! [`LocalStore`] is the raw blob interface. [`RecordStore`] layers JSON
//! encoding on top and swallows every failure: a record that cannot be saved
//! leaves the previous one in place, and a record that cannot be read is
//! reported as absent.

mod error;
mod fs;
mod memory;
mod record;

pub use error::{Result, StorageError};
pub use fs::FsStore;
pub use memory::MemoryStore;
pub use record::RecordStore;

/// Durable blob storage addressed by name.
pub trait LocalStore: Send + Sync {
    /// Persist `blob` under `name`, replacing any previous record.
    fn save(&self, name: &str, blob: &[u8]) -> Result<()>;

    /// Read the record stored under `name`, or `None` if there is none.
    fn load(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Remove the record stored under `name`. Removing a missing record
    /// succeeds.
    fn delete(&self, name: &str) -> Result<()>;

    /// Names of all records starting with `prefix`, in no particular order.
    fn list_names(&self, prefix: &str) -> Result<Vec<String>>;
}
