//! Session context for the filtering engine.
//!
//! An [`Engine`] owns everything a session shares: the read-only policy, the
//! seen-entry indices, the processed-post set and the collaborators. It is
//! built once by [`Engine::start`] and torn down by [`Engine::shutdown`].

use crate::config::{FeedsiftConfig, FilterPolicy, StoredSettings};
use crate::models::{Decision, IndexKind, PipelineStage, PostRecord};
use crate::services::media::MediaFetcher;
use crate::services::scan::{PostSink, ScanCoordinator, ScanReport};
use crate::services::store::StoreStats;
use crate::services::{DecisionPipeline, MediaHashOrchestrator, SeenEntryStore};
use crate::storage::{KeyValueStore, PrivacyModeProbe, SettingsSource};
use crate::{Result, current_timestamp_millis};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Storage footprint of the seen-entry indices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EngineStats {
    /// Entry counts per index.
    pub entries: StoreStats,
    /// Serialized size of the persisted indices in KiB.
    pub size_kib: f64,
    /// Whether scans evaluate posts.
    pub enabled: bool,
}

/// A running filtering session.
pub struct Engine {
    enabled: bool,
    settings: StoredSettings,
    policy: Arc<FilterPolicy>,
    store: Arc<SeenEntryStore>,
    persistence: Arc<dyn KeyValueStore>,
    coordinator: ScanCoordinator,
}

impl Engine {
    /// Starts a session.
    ///
    /// Loads the filter settings and, unless the session is restricted to
    /// private contexts and `probe` reports a normal one, loads the indices,
    /// sweeps expired entries and persists the indices the sweep changed.
    /// Storage failures are logged and the session starts from whatever
    /// state could be read.
    #[instrument(skip_all, fields(operation = "engine_start"))]
    pub async fn start(
        config: &FeedsiftConfig,
        persistence: Arc<dyn KeyValueStore>,
        fetcher: Arc<dyn MediaFetcher>,
        probe: &dyn PrivacyModeProbe,
    ) -> Self {
        let settings = SettingsSource::new(persistence.clone())
            .load_or_default()
            .await;
        let policy = Arc::new(FilterPolicy::from_settings(&settings, config.link_ownership));

        let enabled = !settings.incognito_exclusive_mode || probe.is_private().await;
        let store = Arc::new(SeenEntryStore::new());

        if enabled {
            if let Err(e) = store.load_all(persistence.as_ref()).await {
                tracing::warn!(error = %e, "Failed to load seen entries, starting empty");
            }
            let removed =
                store.sweep_expired(current_timestamp_millis(), policy.delete_threshold_ms);
            if removed > 0 {
                if let Err(e) = store.persist_dirty(persistence.as_ref()).await {
                    tracing::warn!(error = %e, "Failed to persist swept indices");
                }
            }
            tracing::info!(
                entries = store.stats().total(),
                removed,
                threshold = %settings.delete_threshold(),
                "Engine started"
            );
        } else {
            tracing::info!("Private-only mode in a normal context, engine disabled");
        }

        let media = MediaHashOrchestrator::new(fetcher)
            .with_timeout(config.media.timeout)
            .with_gallery_origin(config.media.gallery_origin.clone());
        let pipeline = Arc::new(DecisionPipeline::new(policy.clone(), store.clone(), media));
        let coordinator =
            ScanCoordinator::new(policy.clone(), store.clone(), pipeline, persistence.clone());

        Self {
            enabled,
            settings,
            policy,
            store,
            persistence,
            coordinator,
        }
    }

    /// Returns true if scans evaluate posts.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the settings the session started with.
    #[must_use]
    pub const fn settings(&self) -> &StoredSettings {
        &self.settings
    }

    /// Returns the session policy.
    #[must_use]
    pub fn policy(&self) -> &FilterPolicy {
        &self.policy
    }

    /// Returns the seen-entry indices.
    #[must_use]
    pub fn store(&self) -> &SeenEntryStore {
        &self.store
    }

    /// Scans one batch of rendered posts.
    ///
    /// A disabled engine keeps every post and touches no state.
    pub async fn scan(&self, posts: &[PostRecord], sink: &dyn PostSink) -> ScanReport {
        if self.enabled {
            return self.coordinator.scan(posts, sink).await;
        }

        let decisions: Vec<Decision> = posts
            .iter()
            .map(|record| {
                let decision = Decision::keep(record.post_id(), PipelineStage::Pending);
                sink.apply(record, &decision);
                decision
            })
            .collect();
        ScanReport {
            received: posts.len(),
            decisions,
            ..ScanReport::default()
        }
    }

    /// Removes expired entries now and persists the changed indices.
    ///
    /// # Errors
    ///
    /// Returns an error if a changed index cannot be written.
    pub async fn sweep(&self) -> Result<usize> {
        let removed = self
            .store
            .sweep_expired(current_timestamp_millis(), self.policy.delete_threshold_ms);
        self.flush().await?;
        Ok(removed)
    }

    /// Persists every index with unflushed mutations.
    ///
    /// # Errors
    ///
    /// Returns an error if an index cannot be written.
    pub async fn flush(&self) -> Result<Vec<IndexKind>> {
        self.store.persist_dirty(self.persistence.as_ref()).await
    }

    /// Returns entry counts and the persisted size of the indices.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    #[allow(clippy::cast_precision_loss)]
    pub async fn stats(&self) -> Result<EngineStats> {
        let bytes = self
            .persistence
            .size_of(&IndexKind::storage_keys())
            .await?;
        Ok(EngineStats {
            entries: self.store.stats(),
            size_kib: bytes as f64 / 1024.0,
            enabled: self.enabled,
        })
    }

    /// Deletes the seen-entry indices. Settings are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub async fn clear(&self) -> Result<()> {
        self.persistence.remove(&IndexKind::storage_keys()).await?;
        self.store.clear();
        self.coordinator.processed().clear();
        tracing::info!("Seen entries cleared");
        Ok(())
    }

    /// Deletes everything in the store, settings included.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub async fn reset(&self) -> Result<()> {
        self.persistence.clear().await?;
        self.store.clear();
        self.coordinator.processed().clear();
        tracing::info!("Store reset");
        Ok(())
    }

    /// Ends the session, flushing pending index mutations.
    ///
    /// # Errors
    ///
    /// Returns an error if an index cannot be written.
    pub async fn shutdown(self) -> Result<()> {
        if self.enabled {
            self.flush().await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("enabled", &self.enabled)
            .field("policy", &self.policy)
            .field("entries", &self.store.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::media::{FetchRequest, FetchResponse};
    use crate::services::scan::NoopSink;
    use crate::storage::{MemoryStore, Record, StaticPrivacyMode};
    use async_trait::async_trait;
    use serde_json::json;

    struct NoMedia;

    #[async_trait]
    impl MediaFetcher for NoMedia {
        async fn fetch(&self, _request: FetchRequest) -> FetchResponse {
            FetchResponse::failed("offline")
        }
    }

    fn store_with(pairs: &[(&str, serde_json::Value)]) -> Arc<MemoryStore> {
        let record: Record = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect();
        Arc::new(MemoryStore::with_record(record))
    }

    async fn start(kv: Arc<MemoryStore>, private: bool) -> Engine {
        Engine::start(
            &FeedsiftConfig::default(),
            kv,
            Arc::new(NoMedia),
            &StaticPrivacyMode::new(private),
        )
        .await
    }

    fn link(id: &str, subreddit: &str) -> PostRecord {
        PostRecord::new(id, "link")
            .with_href("https://example.com/story")
            .with_author("alice")
            .with_subreddit(subreddit)
            .with_title(id)
    }

    #[tokio::test]
    async fn test_start_sweeps_and_persists_expired_entries() {
        let now = current_timestamp_millis();
        let kv = store_with(&[
            ("deleteThreshold", json!(0)),
            (
                "seenPostsID",
                json!({
                    "stale": {"value": "v", "timestamp": now - 7 * 60 * 60 * 1000},
                    "fresh": {"value": "v", "timestamp": now}
                }),
            ),
        ]);

        let engine = start(kv.clone(), false).await;
        assert_eq!(engine.store().len(IndexKind::TitleAuthor), 1);

        let persisted = kv.snapshot();
        let index = persisted["seenPostsID"].as_object().unwrap();
        assert!(index.contains_key("fresh"));
        assert!(!index.contains_key("stale"));
    }

    #[tokio::test]
    async fn test_scan_hides_cross_posted_link() {
        let kv = Arc::new(MemoryStore::new());
        let engine = start(kv.clone(), false).await;

        let report = engine
            .scan(&[link("t3_a", "rust"), link("t3_b", "programming")], &NoopSink)
            .await;
        assert_eq!(report.hidden, 1);
        assert!(kv.snapshot().contains_key("seenPostsSubreddit"));
    }

    #[tokio::test]
    async fn test_private_only_mode_disables_engine() {
        let kv = store_with(&[("incognitoExclusiveMode", json!(true))]);
        let engine = start(kv.clone(), false).await;
        assert!(!engine.is_enabled());

        let report = engine
            .scan(&[link("t3_a", "rust"), link("t3_b", "programming")], &NoopSink)
            .await;
        assert_eq!(report.hidden, 0);
        assert_eq!(report.decisions.len(), 2);
        assert!(engine.store().is_empty());
        assert_eq!(kv.snapshot().len(), 1);

        let private = start(kv, true).await;
        assert!(private.is_enabled());
    }

    #[tokio::test]
    async fn test_clear_keeps_settings() {
        let kv = store_with(&[("hideTextPosts", json!(false))]);
        let engine = start(kv.clone(), false).await;
        engine.scan(&[link("t3_a", "rust")], &NoopSink).await;
        assert!(engine.stats().await.unwrap().size_kib > 0.0);

        engine.clear().await.unwrap();
        let snapshot = kv.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot["hideTextPosts"], json!(false));
        assert_eq!(engine.stats().await.unwrap().entries.total(), 0);

        engine.reset().await.unwrap();
        assert!(kv.snapshot().is_empty());
    }
}
