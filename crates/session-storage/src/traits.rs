//! Storage trait definitions.

use crate::StorageResult;
use std::sync::Arc;

/// Key/value backend for persisted session fields.
pub trait KeyValueStore: Send + Sync {
    /// Store a value
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Retrieve a value
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Delete a value, returning whether it existed
    fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Check if a key exists
    fn has(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Apply a batch of writes and deletes.
    ///
    /// The default implementation applies them one by one. Backends that can
    /// commit a batch as a unit override this; callers that need the batch
    /// to be all-or-nothing should check [`KeyValueStore::atomic_batches`].
    fn write_batch(&self, set: &[(&str, &str)], delete: &[&str]) -> StorageResult<()> {
        for (key, value) in set {
            self.set(key, value)?;
        }
        for key in delete {
            self.delete(key)?;
        }
        Ok(())
    }

    /// Whether `write_batch` commits all-or-nothing.
    fn atomic_batches(&self) -> bool {
        false
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        (**self).delete(key)
    }

    fn has(&self, key: &str) -> StorageResult<bool> {
        (**self).has(key)
    }

    fn write_batch(&self, set: &[(&str, &str)], delete: &[&str]) -> StorageResult<()> {
        (**self).write_batch(set, delete)
    }

    fn atomic_batches(&self) -> bool {
        (**self).atomic_batches()
    }
}
