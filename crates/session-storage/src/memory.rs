//! In-memory backend.

use crate::{KeyValueStore, StorageResult};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Process-local store. Nothing survives a restart; used by tests and by
/// callers that want a session only for the lifetime of the process.
#[derive(Default)]
pub struct MemoryStorage {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.data.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.data.lock().get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        Ok(self.data.lock().remove(key).is_some())
    }

    fn write_batch(&self, set: &[(&str, &str)], delete: &[&str]) -> StorageResult<()> {
        let mut data = self.data.lock();
        for (key, value) in set {
            data.insert(key.to_string(), value.to_string());
        }
        for key in delete {
            data.remove(*key);
        }
        Ok(())
    }

    fn atomic_batches(&self) -> bool {
        true
    }
}
