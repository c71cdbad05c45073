//! Storage maintenance commands.

// CLI commands are allowed to use println! for output
#![allow(clippy::print_stdout)]

use crate::models::IndexKind;
use crate::services::{Engine, EngineStats};
use crate::{Error, Result};

/// Shows tracked entries per index and the persisted size.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub async fn cmd_stats(engine: &Engine, json: bool) -> Result<EngineStats> {
    let stats = engine.stats().await?;

    if json {
        let line =
            serde_json::to_string(&stats).map_err(|e| Error::operation("serialize_stats", e))?;
        println!("{line}");
        return Ok(stats);
    }

    println!("Feedsift Storage");
    println!("================");
    println!();
    for kind in IndexKind::all() {
        println!("{:<14} {:>8}", kind.as_str(), stats.entries.get(*kind));
    }
    println!("{:<14} {:>8}", "total", stats.entries.total());
    println!();
    println!("Size: {:.2} KiB", stats.size_kib);
    println!("Retention: {}", engine.settings().delete_threshold());
    if !stats.enabled {
        println!("Engine disabled outside private contexts");
    }
    Ok(stats)
}

/// Removes expired entries and persists the changed indices.
///
/// # Errors
///
/// Returns an error if a changed index cannot be written.
pub async fn cmd_sweep(engine: &Engine) -> Result<usize> {
    let removed = engine.sweep().await?;
    println!(
        "Removed {removed} expired entries (retention: {})",
        engine.settings().delete_threshold()
    );
    Ok(removed)
}

/// Deletes the seen-entry indices.
///
/// # Errors
///
/// Returns an error if the store cannot be written.
pub async fn cmd_clear(engine: &Engine) -> Result<()> {
    engine.clear().await?;
    println!("Seen entries deleted");
    Ok(())
}

/// Deletes everything in the store, settings included.
///
/// # Errors
///
/// Returns an error if the store cannot be written.
pub async fn cmd_reset(engine: &Engine) -> Result<()> {
    engine.reset().await?;
    println!("Storage reset, settings restored to defaults");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeedsiftConfig;
    use crate::current_timestamp_millis;
    use crate::services::media::{FetchRequest, FetchResponse, MediaFetcher};
    use crate::storage::{MemoryStore, Record, StaticPrivacyMode};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct NoMedia;

    #[async_trait]
    impl MediaFetcher for NoMedia {
        async fn fetch(&self, _request: FetchRequest) -> FetchResponse {
            FetchResponse::failed("offline")
        }
    }

    async fn engine(kv: Arc<MemoryStore>) -> Engine {
        Engine::start(
            &FeedsiftConfig::default(),
            kv,
            Arc::new(NoMedia),
            &StaticPrivacyMode::new(false),
        )
        .await
    }

    #[tokio::test]
    async fn test_stats_counts_loaded_entries() {
        let now = current_timestamp_millis();
        let mut record = Record::new();
        record.insert(
            "seenPostsSubreddit".to_string(),
            json!({
                "a": {"value": "rust", "timestamp": now},
                "b": {"value": "rust", "timestamp": now}
            }),
        );
        let engine = engine(Arc::new(MemoryStore::with_record(record))).await;

        let stats = cmd_stats(&engine, true).await.unwrap();
        assert_eq!(stats.entries.get(IndexKind::LinkAuthor), 2);
        assert!(stats.size_kib > 0.0);
    }

    #[tokio::test]
    async fn test_sweep_on_fresh_store_removes_nothing() {
        let engine = engine(Arc::new(MemoryStore::new())).await;
        assert_eq!(cmd_sweep(&engine).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reset_clears_settings() {
        let mut record = Record::new();
        record.insert("debugMode".to_string(), json!(true));
        let kv = Arc::new(MemoryStore::with_record(record));
        let engine = engine(kv.clone()).await;

        cmd_clear(&engine).await.unwrap();
        assert_eq!(kv.snapshot().len(), 1);

        cmd_reset(&engine).await.unwrap();
        assert!(kv.snapshot().is_empty());
    }
}
