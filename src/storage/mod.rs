//! Key-value storage standing in for browser local storage.
//!
//! Values are strings; typed access goes through JSON. A value that is
//! absent or fails to decode reads as "nothing stored", never as an error.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage quota exceeded: {used} of {limit} bytes")]
    QuotaExceeded { used: usize, limit: usize },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Synchronous string key-value store with local-storage semantics.
pub trait Storage: Send + Sync {
    fn name(&self) -> &str;

    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    fn remove_item(&self, key: &str) -> StorageResult<bool>;

    fn keys(&self) -> StorageResult<Vec<String>>;
}

/// JSON helpers over [`Storage`].
pub trait StorageExt: Storage {
    /// Decode a stored JSON value. Corrupt or unreadable entries are
    /// logged and reported as absent.
    fn load_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.get_item(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(storage = self.name(), key, error = %e, "Failed to read storage");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(storage = self.name(), key, error = %e, "Ignoring corrupt stored value");
                None
            }
        }
    }

    fn store_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        let raw = serde_json::to_string(value)?;
        self.set_item(key, &raw)
    }
}

impl<S: Storage + ?Sized> StorageExt for S {}
