//! Persisted session storage.
//!
//! A small key/value abstraction with a JSON file backend and an in-memory
//! backend, plus [`SessionStore`], which reads and writes the three session
//! fields (access token, refresh token, user) as one record.

mod file;
mod keys;
mod memory;
mod session;
mod traits;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use session::{PersistedSession, SessionStore};
pub use traits::KeyValueStore;

use std::path::PathBuf;
use thiserror::Error;

/// Storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Platform(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Session store backed by a JSON file at `path`.
pub fn create_file_session_store(path: impl Into<PathBuf>) -> SessionStore {
    SessionStore::new(Box::new(FileStorage::new(path)))
}
