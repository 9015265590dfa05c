//! In-memory snapshot store.
//!
//! Useful for unit tests and throwaway devnets. Values live in a
//! `HashMap` behind a mutex and are lost when the process exits.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{SnapshotStore, StorageError};

/// In-memory implementation of [`SnapshotStore`].
#[derive(Default)]
pub struct InMemorySnapshotStore {
    entries: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_overwrites_previous_value() {
        let store = InMemorySnapshotStore::new();
        assert!(store.is_empty());

        store.put(b"k", b"one").expect("put");
        store.put(b"k", b"two").expect("put");

        assert_eq!(store.get(b"k").expect("get"), Some(b"two".to_vec()));
        assert_eq!(store.len(), 1);
        assert!(store.get(b"missing").expect("get").is_none());
    }
}
