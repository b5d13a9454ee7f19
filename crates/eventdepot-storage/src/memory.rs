//! Process-local store for tests and ephemeral depots.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{LocalStore, Result};

/// In-memory [`LocalStore`]. Clones share the same records, which lets a test
/// keep a handle while the depot owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All record names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.records.lock().keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.lock().contains_key(name)
    }
}

impl LocalStore for MemoryStore {
    fn save(&self, name: &str, blob: &[u8]) -> Result<()> {
        self.records.lock().insert(name.to_string(), blob.to_vec());
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.records.lock().get(name).cloned())
    }

    fn delete(&self, name: &str) -> Result<()> {
        self.records.lock().remove(name);
        Ok(())
    }

    fn list_names(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .records
            .lock()
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }
}
