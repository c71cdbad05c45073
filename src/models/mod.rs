//! Data models for feedsift.
//!
//! This module contains the records exchanged with the feed boundary, the
//! seen-entry index types and the per-post decision types.

mod decision;
mod entry;
mod post;

pub use decision::{Decision, HideReason, PipelineStage};
pub use entry::{IndexKind, SeenEntry};
pub use post::{PostId, PostRecord, PostType};
