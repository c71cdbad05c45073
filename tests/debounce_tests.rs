//! Debounced rescans of a growing feed.
//!
//! Simulates DOM mutation bursts: each rendered post notifies the debouncer,
//! and each fire scans the whole feed rendered so far.

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use async_trait::async_trait;
use feedsift::cli::FeedBuffer;
use feedsift::config::FeedsiftConfig;
use feedsift::services::media::{FetchRequest, FetchResponse, MediaFetcher};
use feedsift::services::{Debouncer, Engine, NoopSink, ScanReport};
use feedsift::storage::{MemoryStore, StaticPrivacyMode};
use feedsift::PostRecord;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const WINDOW: Duration = Duration::from_millis(50);

struct NoMedia;

#[async_trait]
impl MediaFetcher for NoMedia {
    async fn fetch(&self, _request: FetchRequest) -> FetchResponse {
        FetchResponse::failed("offline")
    }
}

struct Harness {
    feed: FeedBuffer,
    reports: Arc<Mutex<Vec<ScanReport>>>,
    debouncer: Debouncer,
}

impl Harness {
    async fn start() -> Self {
        let engine = Arc::new(
            Engine::start(
                &FeedsiftConfig::default(),
                Arc::new(MemoryStore::new()),
                Arc::new(NoMedia),
                &StaticPrivacyMode::new(false),
            )
            .await,
        );
        let feed = FeedBuffer::new();
        let reports = Arc::new(Mutex::new(Vec::new()));

        let debouncer = {
            let feed = feed.clone();
            let reports = reports.clone();
            Debouncer::spawn(WINDOW, move || {
                let engine = engine.clone();
                let posts = feed.snapshot();
                let reports = reports.clone();
                async move {
                    let report = engine.scan(&posts, &NoopSink).await;
                    reports.lock().unwrap().push(report);
                }
            })
        };

        Self {
            feed,
            reports,
            debouncer,
        }
    }

    fn render(&self, id: &str) {
        self.feed.push(
            PostRecord::new(id, "text")
                .with_author("alice")
                .with_title(format!("post {id}")),
        );
        assert!(self.debouncer.notify());
    }

    fn scans(&self) -> usize {
        self.reports.lock().unwrap().len()
    }
}

#[tokio::test(start_paused = true)]
async fn test_mutation_burst_triggers_one_scan() {
    let harness = Harness::start().await;

    for i in 0..25 {
        harness.render(&format!("t3_{i}"));
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    assert_eq!(harness.scans(), 0);

    tokio::time::sleep(WINDOW * 2).await;
    assert_eq!(harness.scans(), 1);
    assert_eq!(harness.reports.lock().unwrap()[0].evaluated, 25);
}

#[tokio::test(start_paused = true)]
async fn test_mutation_after_quiet_window_rescans() {
    let harness = Harness::start().await;

    harness.render("t3_a");
    harness.render("t3_b");
    tokio::time::sleep(WINDOW * 2).await;
    assert_eq!(harness.scans(), 1);

    harness.render("t3_c");
    tokio::time::sleep(WINDOW * 2).await;
    assert_eq!(harness.scans(), 2);

    // The second scan sees the whole feed but only evaluates the new post.
    let reports = harness.reports.lock().unwrap();
    assert_eq!(reports[1].received, 3);
    assert_eq!(reports[1].already_processed, 2);
    assert_eq!(reports[1].evaluated, 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_runs_pending_scan() {
    let harness = Harness::start().await;
    harness.render("t3_a");

    let Harness {
        reports, debouncer, ..
    } = harness;
    debouncer.shutdown().await;
    assert_eq!(reports.lock().unwrap().len(), 1);
}
