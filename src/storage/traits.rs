//! Key-value store trait.

use crate::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// A set of keys and their JSON values.
pub type Record = Map<String, Value>;

/// Async key-value store holding JSON values under string keys.
///
/// Writes replace whole values. Implementations must be safe to share
/// between tasks.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the given keys. Absent keys are omitted from the result.
    async fn get(&self, keys: &[&str]) -> Result<Record>;

    /// Writes every key in `record`, replacing previous values.
    async fn set(&self, record: Record) -> Result<()>;

    /// Removes the given keys. Absent keys are ignored.
    async fn remove(&self, keys: &[&str]) -> Result<()>;

    /// Removes every key.
    async fn clear(&self) -> Result<()>;

    /// Returns the serialized size in bytes of the given keys' values.
    async fn size_of(&self, keys: &[&str]) -> Result<usize> {
        let record = self.get(keys).await?;
        record.values().try_fold(0usize, |acc, value| {
            serde_json::to_vec(value)
                .map(|bytes| acc + bytes.len())
                .map_err(|e| crate::Error::operation("measure_value", e))
        })
    }
}
