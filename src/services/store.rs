//! Expiring seen-entry indices.
//!
//! Three independent key -> [`SeenEntry`] maps. Keys are write-once: once
//! present, an entry is never updated and leaves only through a TTL sweep.
//! Mutations accumulate in memory and are flushed per index, only for
//! indices that changed since their last successful flush.

use crate::models::{IndexKind, SeenEntry};
use crate::storage::{KeyValueStore, Record};
use crate::Result;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::instrument;

/// Outcome of an atomic compare-and-insert on one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// The key was absent and now holds the observed value.
    Inserted,
    /// The key already holds the observed value.
    SameOrigin,
    /// The key holds a different value.
    Conflict {
        /// The stored first-seen entry.
        existing: SeenEntry,
    },
}

impl Observation {
    /// Returns true if a different origin claimed the key first.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Entry counts per index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct StoreStats {
    /// Link + author entries.
    pub link_author: usize,
    /// Title + author entries.
    pub title_author: usize,
    /// Media content entries.
    pub media_content: usize,
}

impl StoreStats {
    /// Total entries across indices.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.link_author + self.title_author + self.media_content
    }

    /// Entries in one index.
    #[must_use]
    pub const fn get(&self, kind: IndexKind) -> usize {
        match kind {
            IndexKind::LinkAuthor => self.link_author,
            IndexKind::TitleAuthor => self.title_author,
            IndexKind::MediaContent => self.media_content,
        }
    }
}

#[derive(Debug, Default)]
struct IndexState {
    entries: HashMap<String, SeenEntry>,
    // Bumped on every mutation; dirty while it differs from `flushed`.
    version: u64,
    flushed: u64,
}

impl IndexState {
    const fn is_dirty(&self) -> bool {
        self.version != self.flushed
    }

    const fn touch(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}

const fn slot(kind: IndexKind) -> usize {
    match kind {
        IndexKind::LinkAuthor => 0,
        IndexKind::TitleAuthor => 1,
        IndexKind::MediaContent => 2,
    }
}

/// The three seen-entry indices with dirty tracking.
///
/// # Concurrency
///
/// All access goes through one `RwLock`. [`SeenEntryStore::observe`] performs
/// the absent-check and insert under a single write guard, so pipelines that
/// resume after an await cannot both insert the same key.
///
/// Lock poisoning is recovered from: entries are plain data and every
/// mutation leaves the maps consistent.
#[derive(Debug, Default)]
pub struct SeenEntryStore {
    indices: RwLock<[IndexState; 3]>,
}

impl SeenEntryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry stored under `key`.
    #[must_use]
    pub fn lookup(&self, kind: IndexKind, key: &str) -> Option<SeenEntry> {
        let indices = self.indices.read().unwrap_or_else(PoisonError::into_inner);
        indices[slot(kind)].entries.get(key).cloned()
    }

    /// Inserts `value` under `key` only if the key is absent.
    ///
    /// Returns true if the insert happened.
    pub fn record_if_absent(&self, kind: IndexKind, key: &str, value: &str, now: u64) -> bool {
        matches!(self.observe(kind, key, value, now), Observation::Inserted)
    }

    /// Atomically compares `value` against the stored entry for `key`,
    /// inserting it if the key is absent.
    pub fn observe(&self, kind: IndexKind, key: &str, value: &str, now: u64) -> Observation {
        let mut indices = self.indices.write().unwrap_or_else(PoisonError::into_inner);
        let index = &mut indices[slot(kind)];

        match index.entries.get(key) {
            Some(existing) if existing.value == value => Observation::SameOrigin,
            Some(existing) => Observation::Conflict {
                existing: existing.clone(),
            },
            None => {
                index
                    .entries
                    .insert(key.to_string(), SeenEntry::new(value, now));
                index.touch();
                Observation::Inserted
            },
        }
    }

    /// Removes entries at least `ttl_ms` old in every index.
    ///
    /// `None` never evicts. Returns the number of removed entries.
    #[instrument(skip(self), fields(operation = "sweep_expired"))]
    pub fn sweep_expired(&self, now: u64, ttl_ms: Option<u64>) -> usize {
        let Some(ttl_ms) = ttl_ms else {
            return 0;
        };

        let mut indices = self.indices.write().unwrap_or_else(PoisonError::into_inner);
        let mut removed = 0;
        for (kind, index) in IndexKind::all().iter().zip(indices.iter_mut()) {
            let before = index.entries.len();
            index.entries.retain(|_, entry| !entry.is_expired(now, ttl_ms));
            let dropped = before - index.entries.len();
            if dropped > 0 {
                index.touch();
                tracing::debug!(index = %kind, removed = dropped, "Swept expired entries");
            }
            removed += dropped;
        }

        metrics::counter!("feedsift_sweep_removed_total").increment(removed as u64);
        removed
    }

    /// Replaces in-memory indices with the persisted ones.
    ///
    /// An index whose stored value is malformed starts empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    #[instrument(skip(self, store), fields(operation = "load_indices"))]
    pub async fn load_all(&self, store: &dyn KeyValueStore) -> Result<()> {
        let record = store.get(&IndexKind::storage_keys()).await?;

        let mut loaded: [HashMap<String, SeenEntry>; 3] = Default::default();
        for kind in IndexKind::all() {
            let Some(value) = record.get(kind.storage_key()) else {
                continue;
            };
            match serde_json::from_value::<HashMap<String, SeenEntry>>(value.clone()) {
                Ok(entries) => loaded[slot(*kind)] = entries,
                Err(e) => {
                    tracing::warn!(index = %kind, error = %e, "Discarding malformed index");
                },
            }
        }

        let mut indices = self.indices.write().unwrap_or_else(PoisonError::into_inner);
        for (kind, (index, entries)) in IndexKind::all()
            .iter()
            .zip(indices.iter_mut().zip(loaded))
        {
            index.entries = entries;
            index.flushed = index.version;
            record_gauge(*kind, index.entries.len());
        }
        Ok(())
    }

    /// Writes every index that changed since its last flush.
    ///
    /// Each index is written independently; an index whose write fails stays
    /// dirty and is retried by the next call. Returns the flushed indices.
    ///
    /// # Errors
    ///
    /// Returns the first write error after attempting every dirty index.
    #[instrument(skip(self, store), fields(operation = "persist_indices"))]
    pub async fn persist_dirty(&self, store: &dyn KeyValueStore) -> Result<Vec<IndexKind>> {
        let pending: Vec<(IndexKind, u64, Record)> = {
            let indices = self.indices.read().unwrap_or_else(PoisonError::into_inner);
            let mut pending = Vec::new();
            for kind in IndexKind::all() {
                let index = &indices[slot(*kind)];
                if !index.is_dirty() {
                    continue;
                }
                let value = serde_json::to_value(&index.entries)
                    .map_err(|e| crate::Error::operation("serialize_index", e))?;
                let mut record = Record::new();
                record.insert(kind.storage_key().to_string(), value);
                pending.push((*kind, index.version, record));
            }
            pending
        };

        let mut flushed = Vec::with_capacity(pending.len());
        let mut first_error = None;
        for (kind, version, record) in pending {
            match store.set(record).await {
                Ok(()) => {
                    let mut indices = self.indices.write().unwrap_or_else(PoisonError::into_inner);
                    let index = &mut indices[slot(kind)];
                    index.flushed = version;
                    record_gauge(kind, index.entries.len());
                    drop(indices);
                    flushed.push(kind);
                },
                Err(e) => {
                    tracing::warn!(index = %kind, error = %e, "Failed to persist index");
                    first_error.get_or_insert(e);
                },
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(flushed),
        }
    }

    /// Returns the indices with unflushed mutations.
    #[must_use]
    pub fn dirty_indices(&self) -> Vec<IndexKind> {
        let indices = self.indices.read().unwrap_or_else(PoisonError::into_inner);
        IndexKind::all()
            .iter()
            .copied()
            .filter(|kind| indices[slot(*kind)].is_dirty())
            .collect()
    }

    /// Returns the number of entries in one index.
    #[must_use]
    pub fn len(&self, kind: IndexKind) -> usize {
        let indices = self.indices.read().unwrap_or_else(PoisonError::into_inner);
        indices[slot(kind)].entries.len()
    }

    /// Returns true if every index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stats().total() == 0
    }

    /// Returns entry counts per index.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let indices = self.indices.read().unwrap_or_else(PoisonError::into_inner);
        StoreStats {
            link_author: indices[slot(IndexKind::LinkAuthor)].entries.len(),
            title_author: indices[slot(IndexKind::TitleAuthor)].entries.len(),
            media_content: indices[slot(IndexKind::MediaContent)].entries.len(),
        }
    }

    /// Drops every in-memory entry without marking indices dirty.
    ///
    /// Used after the persisted indices were removed.
    pub fn clear(&self) {
        let mut indices = self.indices.write().unwrap_or_else(PoisonError::into_inner);
        for (kind, index) in IndexKind::all().iter().zip(indices.iter_mut()) {
            index.entries.clear();
            index.flushed = index.version;
            record_gauge(*kind, 0);
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn record_gauge(kind: IndexKind, len: usize) {
    metrics::gauge!("feedsift_store_entries", "index" => kind.as_str()).set(len as f64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use serde_json::json;

    #[test]
    fn test_record_if_absent_first_writer_wins() {
        let store = SeenEntryStore::new();
        assert!(store.record_if_absent(IndexKind::LinkAuthor, "k", "v1", 10));
        assert!(!store.record_if_absent(IndexKind::LinkAuthor, "k", "v2", 20));

        let entry = store.lookup(IndexKind::LinkAuthor, "k").unwrap();
        assert_eq!(entry, SeenEntry::new("v1", 10));
    }

    #[test]
    fn test_observe_outcomes() {
        let store = SeenEntryStore::new();
        assert_eq!(
            store.observe(IndexKind::TitleAuthor, "k", "a", 1),
            Observation::Inserted
        );
        assert_eq!(
            store.observe(IndexKind::TitleAuthor, "k", "a", 2),
            Observation::SameOrigin
        );
        let conflict = store.observe(IndexKind::TitleAuthor, "k", "b", 3);
        assert!(conflict.is_conflict());
        assert_eq!(
            conflict,
            Observation::Conflict {
                existing: SeenEntry::new("a", 1)
            }
        );
    }

    #[test]
    fn test_indices_are_independent() {
        let store = SeenEntryStore::new();
        store.record_if_absent(IndexKind::LinkAuthor, "k", "a", 1);
        assert!(store.lookup(IndexKind::TitleAuthor, "k").is_none());
        assert_eq!(
            store.observe(IndexKind::MediaContent, "k", "b", 1),
            Observation::Inserted
        );
        assert_eq!(store.stats().total(), 2);
    }

    #[test]
    fn test_sweep_boundaries() {
        let store = SeenEntryStore::new();
        let now = 1_000_000;
        let ttl = 1_000;
        store.record_if_absent(IndexKind::LinkAuthor, "old", "v", now - ttl - 1);
        store.record_if_absent(IndexKind::LinkAuthor, "edge", "v", now - ttl);
        store.record_if_absent(IndexKind::MediaContent, "fresh", "v", now - ttl + 1);

        assert_eq!(store.sweep_expired(now, None), 0);
        assert_eq!(store.stats().total(), 3);

        assert_eq!(store.sweep_expired(now, Some(ttl)), 2);
        assert!(store.lookup(IndexKind::LinkAuthor, "old").is_none());
        assert!(store.lookup(IndexKind::LinkAuthor, "edge").is_none());
        assert!(store.lookup(IndexKind::MediaContent, "fresh").is_some());
    }

    #[tokio::test]
    async fn test_persist_only_dirty_indices() {
        let kv = MemoryStore::new();
        let store = SeenEntryStore::new();
        assert!(store.persist_dirty(&kv).await.unwrap().is_empty());

        store.record_if_absent(IndexKind::TitleAuthor, "k", "v", 5);
        assert_eq!(store.dirty_indices(), vec![IndexKind::TitleAuthor]);

        let flushed = store.persist_dirty(&kv).await.unwrap();
        assert_eq!(flushed, vec![IndexKind::TitleAuthor]);
        assert!(store.dirty_indices().is_empty());

        let snapshot = kv.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            snapshot["seenPostsID"],
            json!({"k": {"value": "v", "timestamp": 5}})
        );

        // Re-observing the same origin does not dirty the index.
        store.observe(IndexKind::TitleAuthor, "k", "v", 6);
        assert!(store.dirty_indices().is_empty());
    }

    #[tokio::test]
    async fn test_load_all_round_trip() {
        let kv = MemoryStore::new();
        let store = SeenEntryStore::new();
        store.record_if_absent(IndexKind::LinkAuthor, "a", "1", 1);
        store.record_if_absent(IndexKind::MediaContent, "m", "2", 2);
        store.persist_dirty(&kv).await.unwrap();

        let reloaded = SeenEntryStore::new();
        reloaded.load_all(&kv).await.unwrap();
        assert_eq!(reloaded.stats(), store.stats());
        assert_eq!(
            reloaded.lookup(IndexKind::MediaContent, "m"),
            Some(SeenEntry::new("2", 2))
        );
        assert!(reloaded.dirty_indices().is_empty());
    }

    #[tokio::test]
    async fn test_load_all_discards_malformed_index() {
        let mut record = Record::new();
        record.insert("seenPostsSubreddit".to_string(), json!("garbage"));
        record.insert(
            "seenPostsID".to_string(),
            json!({"k": {"value": "v", "timestamp": 1}}),
        );
        let kv = MemoryStore::with_record(record);

        let store = SeenEntryStore::new();
        store.load_all(&kv).await.unwrap();
        assert_eq!(store.len(IndexKind::LinkAuthor), 0);
        assert_eq!(store.len(IndexKind::TitleAuthor), 1);
    }

    struct FailingStore;

    #[async_trait]
    impl KeyValueStore for FailingStore {
        async fn get(&self, _keys: &[&str]) -> Result<Record> {
            Err(crate::Error::operation("get", "unavailable"))
        }
        async fn set(&self, _record: Record) -> Result<()> {
            Err(crate::Error::operation("set", "disk full"))
        }
        async fn remove(&self, _keys: &[&str]) -> Result<()> {
            Ok(())
        }
        async fn clear(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_persist_keeps_index_dirty() {
        let store = SeenEntryStore::new();
        store.record_if_absent(IndexKind::LinkAuthor, "k", "v", 1);
        assert!(store.persist_dirty(&FailingStore).await.is_err());
        assert_eq!(store.dirty_indices(), vec![IndexKind::LinkAuthor]);

        let kv = MemoryStore::new();
        assert_eq!(
            store.persist_dirty(&kv).await.unwrap(),
            vec![IndexKind::LinkAuthor]
        );
    }

    #[test]
    fn test_clear() {
        let store = SeenEntryStore::new();
        store.record_if_absent(IndexKind::LinkAuthor, "k", "v", 1);
        store.clear();
        assert!(store.is_empty());
        assert!(store.dirty_indices().is_empty());
    }
}
