//! Deduplication and filtering services.
//!
//! Leaf-first:
//!
//! - [`IdentityHasher`]: derives identity keys from post attributes
//! - [`SeenEntryStore`]: the three expiring seen-entry indices
//! - [`MediaHashOrchestrator`]: timeout-bounded media hashing
//! - [`DecisionPipeline`]: ordered checks for one post
//! - [`ScanCoordinator`]: batches pipelines over the rendered feed
//! - [`Engine`]: the session context tying them together

pub mod debounce;
mod engine;
mod identity;
pub mod media;
mod pipeline;
mod scan;
mod store;

pub use debounce::Debouncer;
pub use engine::{Engine, EngineStats};
pub use identity::IdentityHasher;
pub use media::{HttpMediaFetcher, MediaFetcher, MediaHashOrchestrator};
pub use pipeline::{DecisionPipeline, PostEvaluator};
pub use scan::{NoopSink, PostSink, ProcessedPostSet, ScanCoordinator, ScanReport};
pub use store::{Observation, SeenEntryStore, StoreStats};
