//! # Feedsift
//!
//! Declutters a scrolling content feed by hiding duplicates, cross-posts and
//! re-uploads of content that was already seen.
//!
//! Posts are matched on several independent identity signals instead of the
//! feed's own post identifiers:
//!
//! - link + author
//! - title + author
//! - byte-identical image or video content
//! - order-independent gallery content
//!
//! The first observed instance of an identity is kept; later instances that
//! claim the same identity from a different origin are hidden.
//!
//! ## Example
//!
//! ```rust,ignore
//! use feedsift::services::{Engine, HttpMediaFetcher, NoopSink};
//! use feedsift::storage::{FilesystemStore, StaticPrivacyMode};
//!
//! let config = FeedsiftConfig::load_default().with_env_overrides();
//! let store = Arc::new(FilesystemStore::new(config.storage_path()));
//! let fetcher = Arc::new(HttpMediaFetcher::new(&config.media.user_agent));
//! let engine = Engine::start(&config, store, fetcher, &StaticPrivacyMode::new(false)).await;
//! let report = engine.scan(&posts, &NoopSink).await;
//! println!("hid {} of {} posts", report.hidden, report.evaluated);
//! engine.shutdown().await?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod cli;
pub mod config;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

pub use config::{DeleteThreshold, FeedsiftConfig, FilterPolicy, LinkOwnership, StoredSettings};
pub use models::{
    Decision, HideReason, IndexKind, PipelineStage, PostId, PostRecord, PostType, SeenEntry,
};
pub use services::{
    DecisionPipeline, Engine, IdentityHasher, MediaHashOrchestrator, ScanCoordinator,
    ScanReport, SeenEntryStore,
};
pub use storage::{FilesystemStore, KeyValueStore, MemoryStore};

/// Error type for feedsift operations.
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Malformed batch files, unknown setting names, bad setting values |
/// | `OperationFailed` | Storage I/O, (de)serialization, HTTP client construction |
/// | `Timeout` | A bounded operation did not finish within its budget |
///
/// None of these are fatal to a scan: the engine logs and fails open.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// An operation exceeded its time budget.
    #[error("operation '{operation}' timed out after {timeout_ms}ms")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The budget that was exceeded.
        timeout_ms: u64,
    },
}

impl Error {
    /// Shorthand for an [`Error::OperationFailed`] with a displayable cause.
    pub fn operation(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for feedsift operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in milliseconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
#[must_use]
pub fn current_timestamp_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
