//! Scan CLI command.
//!
//! Each input file is one page load: a JSON array of rendered post records.
//! Files are scanned in order against the same session, so later batches see
//! the entries recorded by earlier ones.

// CLI commands are allowed to use println! for output
#![allow(clippy::print_stdout)]

use super::DecisionPrinter;
use crate::models::PostRecord;
use crate::services::{Engine, NoopSink, ScanReport};
use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Reads one batch file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a JSON array of
/// post records.
pub async fn read_batch(path: &Path) -> Result<Vec<PostRecord>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::operation("read_batch", format!("{}: {e}", path.display())))?;
    parse_batch(&contents)
        .map_err(|e| Error::InvalidInput(format!("{}: {e}", path.display())))
}

fn parse_batch(contents: &str) -> std::result::Result<Vec<PostRecord>, serde_json::Error> {
    serde_json::from_str(contents)
}

/// Scans each file as one batch and prints the decisions.
///
/// With `json`, prints one [`ScanReport`] object per batch instead of
/// decision lines.
///
/// # Errors
///
/// Returns an error if a batch file cannot be read. Batches before the bad
/// file have already been scanned and printed.
pub async fn cmd_scan(engine: &Engine, files: &[PathBuf], json: bool) -> Result<Vec<ScanReport>> {
    let mut reports = Vec::with_capacity(files.len());

    for path in files {
        let posts = read_batch(path).await?;
        tracing::debug!(file = %path.display(), posts = posts.len(), "Scanning batch");

        let report = if json {
            let report = engine.scan(&posts, &NoopSink).await;
            let line = serde_json::to_string(&report)
                .map_err(|e| Error::operation("serialize_report", e))?;
            println!("{line}");
            report
        } else {
            engine.scan(&posts, &DecisionPrinter::new(false)).await
        };
        reports.push(report);
    }

    if !json && !reports.is_empty() {
        let hidden: usize = reports.iter().map(|r| r.hidden).sum();
        let received: usize = reports.iter().map(|r| r.received).sum();
        println!("{hidden} of {received} posts hidden");
    }

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeedsiftConfig;
    use crate::services::media::{FetchRequest, FetchResponse, MediaFetcher};
    use crate::storage::{MemoryStore, StaticPrivacyMode};
    use async_trait::async_trait;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct NoMedia;

    #[async_trait]
    impl MediaFetcher for NoMedia {
        async fn fetch(&self, _request: FetchRequest) -> FetchResponse {
            FetchResponse::failed("offline")
        }
    }

    #[test]
    fn test_parse_batch_uses_attribute_names() {
        let posts = parse_batch(
            r#"[{"id": "t3_a", "post-type": "link", "content-href": "https://x.test",
                 "author": "alice", "post-title": "Hello", "subreddit-name": "rust"}]"#,
        )
        .unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].subreddit_name, "rust");
    }

    #[test]
    fn test_parse_batch_rejects_object() {
        assert!(parse_batch(r#"{"id": "t3_a"}"#).is_err());
    }

    #[tokio::test]
    async fn test_scan_files_in_order() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first.json");
        let second = dir.path().join("second.json");
        std::fs::write(
            &first,
            r#"[{"id": "t3_a", "post-type": "text", "author": "alice", "post-title": "Same"}]"#,
        )
        .unwrap();
        std::fs::write(
            &second,
            r#"[{"id": "t3_b", "post-type": "text", "author": "alice", "post-title": "same"}]"#,
        )
        .unwrap();

        let engine = Engine::start(
            &FeedsiftConfig::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(NoMedia),
            &StaticPrivacyMode::new(false),
        )
        .await;

        let reports = cmd_scan(&engine, &[first, second], true).await.unwrap();
        assert_eq!(reports[0].hidden, 0);
        assert_eq!(reports[1].hidden, 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let engine = Engine::start(
            &FeedsiftConfig::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(NoMedia),
            &StaticPrivacyMode::new(false),
        )
        .await;
        let missing = PathBuf::from("/nonexistent/feedsift/batch.json");
        assert!(cmd_scan(&engine, &[missing], false).await.is_err());
    }
}
