//! In-memory key-value store.

use super::{KeyValueStore, Record};
use crate::Result;
use async_trait::async_trait;
use std::sync::{PoisonError, RwLock};

/// In-memory key-value store.
///
/// Used for tests and for sessions that must not touch disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<Record>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `record`.
    #[must_use]
    pub fn with_record(record: Record) -> Self {
        Self {
            data: RwLock::new(record),
        }
    }

    /// Returns a copy of everything currently stored.
    #[must_use]
    pub fn snapshot(&self) -> Record {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<Record> {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        Ok(keys
            .iter()
            .filter_map(|k| data.get(*k).map(|v| ((*k).to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, record: Record) -> Result<()> {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.extend(record);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            data.remove(*key);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryStore::new();
        let mut record = Record::new();
        record.insert("a".to_string(), json!(1));
        record.insert("b".to_string(), json!({"x": true}));
        store.set(record).await.unwrap();

        let got = store.get(&["a", "missing"]).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got["a"], json!(1));

        store.remove(&["a"]).await.unwrap();
        assert!(store.get(&["a"]).await.unwrap().is_empty());
        assert_eq!(store.snapshot().len(), 1);

        store.clear().await.unwrap();
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_size_of() {
        let mut record = Record::new();
        record.insert("k".to_string(), json!("abcd"));
        let store = MemoryStore::with_record(record);
        // "abcd" with quotes
        assert_eq!(store.size_of(&["k"]).await.unwrap(), 6);
        assert_eq!(store.size_of(&["none"]).await.unwrap(), 0);
    }
}
