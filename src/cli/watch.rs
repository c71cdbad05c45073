//! Watch CLI command.
//!
//! Simulates a live feed: every NDJSON line read from the input is a newly
//! rendered post. Each line notifies the debouncer, and every quiet window
//! rescans the whole rendered feed. Posts already decided in an earlier
//! window are skipped by the processed-post set, so each post is printed
//! once.

use super::DecisionPrinter;
use crate::models::PostRecord;
use crate::services::{Debouncer, Engine};
use crate::{Error, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Posts rendered so far, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct FeedBuffer {
    posts: Arc<Mutex<Vec<PostRecord>>>,
}

impl FeedBuffer {
    /// Creates an empty feed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rendered post.
    pub fn push(&self, record: PostRecord) {
        self.posts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    /// Returns a copy of the current feed.
    #[must_use]
    pub fn snapshot(&self) -> Vec<PostRecord> {
        self.posts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of rendered posts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.posts.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if nothing was rendered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a watch session consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WatchSummary {
    /// Posts added to the feed.
    pub posts: usize,
    /// Lines that were not valid post records.
    pub skipped: usize,
    /// Debounced scans that ran.
    pub scans: usize,
}

/// Reads post records from `input` until EOF, scanning on quiet windows.
///
/// The pending window is flushed at EOF before returning.
///
/// # Errors
///
/// Returns an error if reading the input fails.
pub async fn cmd_watch<R>(
    engine: Arc<Engine>,
    input: R,
    window: Duration,
    json: bool,
) -> Result<WatchSummary>
where
    R: AsyncBufRead + Unpin,
{
    let feed = FeedBuffer::new();
    let scans = Arc::new(AtomicUsize::new(0));

    let debouncer = {
        let feed = feed.clone();
        let scans = scans.clone();
        Debouncer::spawn(window, move || {
            let engine = engine.clone();
            let posts = feed.snapshot();
            let scans = scans.clone();
            async move {
                scans.fetch_add(1, Ordering::SeqCst);
                engine.scan(&posts, &DecisionPrinter::new(json)).await;
            }
        })
    };

    let mut summary = WatchSummary::default();
    let mut lines = input.lines();
    let read_result = loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(e) => break Err(Error::operation("read_stdin", e)),
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<PostRecord>(&line) {
            Ok(record) => {
                feed.push(record);
                summary.posts += 1;
                debouncer.notify();
            },
            Err(e) => {
                summary.skipped += 1;
                tracing::warn!(error = %e, "Skipping malformed post record");
            },
        }
    };

    debouncer.shutdown().await;
    summary.scans = scans.load(Ordering::SeqCst);
    tracing::debug!(
        posts = summary.posts,
        skipped = summary.skipped,
        scans = summary.scans,
        "Watch finished"
    );
    read_result.map(|()| summary)
}
