//! In-process storage with an optional byte quota, mirroring the
//! fixed quota browsers put on local storage.

use std::collections::HashMap;
use std::sync::RwLock;

use super::{Storage, StorageError, StorageResult};

/// [`Storage`] backed by a `HashMap`; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStorage {
    /// Create an unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes once keys plus values would exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            items: RwLock::default(),
            quota_bytes: Some(bytes),
        }
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every item.
    pub fn clear(&self) {
        self.items
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl Storage for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());

        if let Some(limit) = self.quota_bytes {
            let others: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let used = others + key.len() + value.len();
            if used > limit {
                return Err(StorageError::QuotaExceeded { used, limit });
            }
        }

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<bool> {
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        Ok(items.remove(key).is_some())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = items.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let storage = MemoryStorage::new();
        storage.set_item("theme", "dark").unwrap();
        assert_eq!(storage.get_item("theme").unwrap(), Some("dark".into()));
        assert!(storage.remove_item("theme").unwrap());
        assert!(!storage.remove_item("theme").unwrap());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_quota_rejects_oversized_write() {
        let storage = MemoryStorage::with_quota(16);
        storage.set_item("k", "short").unwrap();

        let err = storage.set_item("other", "this will not fit").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
        assert_eq!(storage.get_item("other").unwrap(), None);
    }

    #[test]
    fn test_quota_counts_replacement_once() {
        let storage = MemoryStorage::with_quota(10);
        storage.set_item("k", "12345").unwrap();
        storage.set_item("k", "123456789").unwrap();
        assert_eq!(storage.get_item("k").unwrap(), Some("123456789".into()));
    }

    #[test]
    fn test_keys_sorted() {
        let storage = MemoryStorage::new();
        storage.set_item("security_events", "[]").unwrap();
        storage.set_item("security_alerts", "[]").unwrap();
        assert_eq!(
            storage.keys().unwrap(),
            vec!["security_alerts", "security_events"]
        );
    }
}
