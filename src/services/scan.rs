//! Batch scanning of the rendered feed.

use crate::config::FilterPolicy;
use crate::models::{Decision, IndexKind, PipelineStage, PostRecord};
use crate::services::SeenEntryStore;
use crate::services::pipeline::PostEvaluator;
use crate::storage::KeyValueStore;
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;
use tracing::instrument;

/// Post identifiers already claimed during this page lifetime.
///
/// Posts without an identifier are never tracked.
#[derive(Debug, Default)]
pub struct ProcessedPostSet {
    ids: RwLock<HashSet<String>>,
}

impl ProcessedPostSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `id` for evaluation. Returns false if it was already claimed.
    pub fn claim(&self, id: &str) -> bool {
        if id.is_empty() {
            return true;
        }
        self.ids
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string())
    }

    /// Returns true if `id` was claimed.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    /// Number of claimed ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if nothing was claimed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets every claim.
    pub fn clear(&self) {
        self.ids.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

/// Receives the hide/keep instruction for each scanned post.
pub trait PostSink: Send + Sync {
    /// Applies `decision` to the element for `record`.
    fn apply(&self, record: &PostRecord, decision: &Decision);
}

/// A sink that ignores every decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl PostSink for NoopSink {
    fn apply(&self, _record: &PostRecord, _decision: &Decision) {}
}

/// Summary of one scan batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    /// Posts handed to the scan.
    pub received: usize,
    /// Posts skipped because an earlier scan already claimed them.
    pub already_processed: usize,
    /// Posts kept without evaluation because their type is not filtered.
    pub gated: usize,
    /// Posts run through the pipeline.
    pub evaluated: usize,
    /// Posts hidden.
    pub hidden: usize,
    /// Decisions for every claimed post: gated posts first, then evaluated
    /// posts, each group in input order.
    pub decisions: Vec<Decision>,
    /// Indices flushed after the batch.
    pub persisted: Vec<IndexKind>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Runs decision pipelines for a batch of rendered posts.
pub struct ScanCoordinator {
    policy: Arc<FilterPolicy>,
    store: Arc<SeenEntryStore>,
    evaluator: Arc<dyn PostEvaluator>,
    persistence: Arc<dyn KeyValueStore>,
    processed: ProcessedPostSet,
}

impl ScanCoordinator {
    /// Creates a coordinator.
    #[must_use]
    pub fn new(
        policy: Arc<FilterPolicy>,
        store: Arc<SeenEntryStore>,
        evaluator: Arc<dyn PostEvaluator>,
        persistence: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            policy,
            store,
            evaluator,
            persistence,
            processed: ProcessedPostSet::new(),
        }
    }

    /// Returns the processed-post set.
    #[must_use]
    pub const fn processed(&self) -> &ProcessedPostSet {
        &self.processed
    }

    /// Scans one batch.
    ///
    /// Each unclaimed post is claimed before evaluation. Posts whose type is
    /// not filtered are kept without running the pipeline. Pipelines for the
    /// remaining posts run concurrently. After every decision is applied, the
    /// indices that changed are flushed once. Storage failures are logged
    /// and leave the indices dirty for the next batch.
    #[instrument(skip_all, fields(operation = "scan", posts = posts.len()))]
    #[allow(clippy::cast_precision_loss)]
    pub async fn scan(&self, posts: &[PostRecord], sink: &dyn PostSink) -> ScanReport {
        let start = Instant::now();
        let mut report = ScanReport {
            received: posts.len(),
            ..ScanReport::default()
        };

        let mut candidates = Vec::new();
        for record in posts {
            if !self.processed.claim(&record.id) {
                report.already_processed += 1;
                continue;
            }
            if self.policy.should_evaluate(record.kind()) {
                candidates.push(record);
            } else {
                report.gated += 1;
                let decision = Decision::keep(record.post_id(), PipelineStage::Pending);
                sink.apply(record, &decision);
                report.decisions.push(decision);
            }
        }

        report.evaluated = candidates.len();
        let decisions = join_all(candidates.iter().map(|r| self.evaluator.evaluate(r))).await;

        for (record, decision) in candidates.into_iter().zip(decisions) {
            if let Some(reason) = decision.reason.filter(|_| decision.hidden) {
                report.hidden += 1;
                metrics::counter!("feedsift_posts_hidden_total", "reason" => reason.as_str())
                    .increment(1);
                tracing::info!(post_id = %record.id, reason = %reason, "Hiding post");
            }
            sink.apply(record, &decision);
            report.decisions.push(decision);
        }

        match self.store.persist_dirty(self.persistence.as_ref()).await {
            Ok(persisted) => report.persisted = persisted,
            Err(e) => tracing::warn!(error = %e, "Failed to persist seen entries"),
        }

        report.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        metrics::counter!("feedsift_posts_scanned_total").increment(report.received as u64);
        metrics::histogram!("feedsift_scan_duration_ms").record(report.duration_ms as f64);
        tracing::debug!(
            evaluated = report.evaluated,
            hidden = report.hidden,
            gated = report.gated,
            already_processed = report.already_processed,
            duration_ms = report.duration_ms,
            "Scan complete"
        );

        report
    }
}

impl std::fmt::Debug for ScanCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanCoordinator")
            .field("policy", &self.policy)
            .field("processed", &self.processed.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HideReason;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingEvaluator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PostEvaluator for CountingEvaluator {
        async fn evaluate(&self, record: &PostRecord) -> Decision {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if record.author == "spammer" {
                Decision::hide(
                    record.post_id(),
                    HideReason::LinkAuthor,
                    PipelineStage::LinkAuthorChecked,
                )
            } else {
                Decision::keep(record.post_id(), PipelineStage::TitleAuthorChecked)
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        applied: Mutex<Vec<(String, bool)>>,
    }

    impl PostSink for RecordingSink {
        fn apply(&self, record: &PostRecord, decision: &Decision) {
            self.applied
                .lock()
                .unwrap()
                .push((record.id.clone(), decision.hidden));
        }
    }

    fn coordinator(policy: FilterPolicy, evaluator: Arc<CountingEvaluator>) -> ScanCoordinator {
        ScanCoordinator::new(
            Arc::new(policy),
            Arc::new(SeenEntryStore::new()),
            evaluator,
            Arc::new(MemoryStore::new()),
        )
    }

    #[test]
    fn test_processed_set_claims_once() {
        let set = ProcessedPostSet::new();
        assert!(set.claim("t3_a"));
        assert!(!set.claim("t3_a"));
        assert!(set.claim(""));
        assert!(set.claim(""));
        assert_eq!(set.len(), 1);
        set.clear();
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_gated_posts_skip_pipeline() {
        let evaluator = Arc::new(CountingEvaluator::default());
        let mut policy = FilterPolicy::default();
        policy.hide_text_posts = false;
        let coordinator = coordinator(policy, evaluator.clone());
        let sink = RecordingSink::default();

        let report = coordinator
            .scan(
                &[
                    PostRecord::new("t3_a", "text"),
                    PostRecord::new("t3_b", "poll"),
                ],
                &sink,
            )
            .await;

        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(report.gated, 2);
        assert_eq!(sink.applied.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_processed_posts_are_not_reevaluated() {
        let evaluator = Arc::new(CountingEvaluator::default());
        let coordinator = coordinator(FilterPolicy::default(), evaluator.clone());
        let posts = vec![
            PostRecord::new("t3_a", "link"),
            PostRecord::new("t3_b", "link").with_author("spammer"),
        ];

        let first = coordinator.scan(&posts, &NoopSink).await;
        assert_eq!(first.evaluated, 2);
        assert_eq!(first.hidden, 1);

        let second = coordinator.scan(&posts, &NoopSink).await;
        assert_eq!(second.already_processed, 2);
        assert_eq!(second.evaluated, 0);
        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 2);
        assert!(coordinator.processed().contains("t3_b"));
    }

    #[tokio::test]
    async fn test_gated_decisions_applied_before_evaluated() {
        let evaluator = Arc::new(CountingEvaluator::default());
        let mut policy = FilterPolicy::default();
        policy.hide_link_posts = false;
        let coordinator = coordinator(policy, evaluator);
        let sink = RecordingSink::default();

        let report = coordinator
            .scan(
                &[
                    PostRecord::new("t3_a", "text").with_author("spammer"),
                    PostRecord::new("t3_b", "link"),
                    PostRecord::new("t3_c", "image"),
                ],
                &sink,
            )
            .await;

        let ids: Vec<_> = report.decisions.iter().map(|d| d.post_id.to_string()).collect();
        assert_eq!(ids, vec!["t3_b", "t3_a", "t3_c"]);
        assert_eq!(
            *sink.applied.lock().unwrap(),
            vec![
                ("t3_b".to_string(), false),
                ("t3_a".to_string(), true),
                ("t3_c".to_string(), false),
            ]
        );
    }
}
