//! Per-post decision pipeline.
//!
//! Checks run in ascending cost order and stop at the first hide:
//!
//! | Stage | Signal | Cost |
//! |-------|--------|------|
//! | crosspost | post type | free |
//! | link + author | local hash | no I/O |
//! | title + author | local hash | no I/O, skipped with less aggressive pruning |
//! | media | image, gif or gallery digest | network |
//! | media | video digest | network, gif links use the image path |
//!
//! Every index check is one atomic [`SeenEntryStore::observe`]: an absent key
//! records the post as its first owner, a matching owner is a no-op, and a
//! different owner hides the post.

use crate::config::{FilterPolicy, LinkOwnership};
use crate::models::{Decision, HideReason, IndexKind, PipelineStage, PostRecord, PostType};
use crate::services::{IdentityHasher, MediaHashOrchestrator, SeenEntryStore};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

/// Evaluates one post to a hide/keep decision.
#[async_trait]
pub trait PostEvaluator: Send + Sync {
    /// Runs every applicable check for `record`.
    async fn evaluate(&self, record: &PostRecord) -> Decision;
}

/// Ordered multi-signal duplicate detection for a single post.
#[derive(Debug, Clone)]
pub struct DecisionPipeline {
    policy: Arc<FilterPolicy>,
    store: Arc<SeenEntryStore>,
    media: MediaHashOrchestrator,
}

enum MediaPath {
    Image,
    Gallery,
    Video,
}

impl DecisionPipeline {
    /// Creates a pipeline over shared session state.
    #[must_use]
    pub const fn new(
        policy: Arc<FilterPolicy>,
        store: Arc<SeenEntryStore>,
        media: MediaHashOrchestrator,
    ) -> Self {
        Self {
            policy,
            store,
            media,
        }
    }

    /// Returns the session policy.
    #[must_use]
    pub fn policy(&self) -> &FilterPolicy {
        &self.policy
    }

    fn check(&self, kind: IndexKind, key: &str, value: &str, record: &PostRecord) -> bool {
        let observation = self
            .store
            .observe(kind, key, value, crate::current_timestamp_millis());
        if self.policy.debug {
            tracing::info!(post_id = %record.id, index = %kind, ?observation, "Index check");
        }
        observation.is_conflict()
    }

    fn owner_value(&self, record: &PostRecord) -> String {
        match self.policy.link_ownership {
            LinkOwnership::Subreddit => IdentityHasher::community_value(&record.subreddit_name),
            LinkOwnership::Post => IdentityHasher::post_value(&record.id),
        }
    }

    const fn media_path(post_type: PostType) -> Option<MediaPath> {
        match post_type {
            PostType::Image | PostType::Gif => Some(MediaPath::Image),
            PostType::Gallery => Some(MediaPath::Gallery),
            PostType::Video => Some(MediaPath::Video),
            PostType::Crosspost | PostType::Text | PostType::Link | PostType::Unknown => None,
        }
    }

    async fn media_hash(
        &self,
        record: &PostRecord,
        path: &MediaPath,
    ) -> Option<(String, HideReason)> {
        match path {
            MediaPath::Image => self
                .media
                .image_hash(&record.content_href)
                .await
                .map(|h| (h, HideReason::Image)),
            MediaPath::Gallery => self
                .media
                .gallery_hash(&record.id)
                .await
                .map(|h| (h, HideReason::Gallery)),
            MediaPath::Video if record.links_to_gif() => self
                .media
                .image_hash(&record.content_href)
                .await
                .map(|h| (h, HideReason::Image)),
            MediaPath::Video => self
                .media
                .video_hash(&record.content_href)
                .await
                .map(|h| (h, HideReason::Video)),
        }
    }
}

#[async_trait]
impl PostEvaluator for DecisionPipeline {
    #[instrument(skip(self, record), fields(post_id = %record.id, post_type = %record.post_type))]
    async fn evaluate(&self, record: &PostRecord) -> Decision {
        let post_id = record.post_id();
        let post_type = record.kind();

        if post_type == PostType::Crosspost && self.policy.hide_crossposts {
            return Decision::hide(
                post_id,
                HideReason::Crosspost,
                PipelineStage::CrosspostChecked,
            );
        }

        let link_key = IdentityHasher::record_link_key(record);
        if self.check(IndexKind::LinkAuthor, &link_key, &self.owner_value(record), record) {
            return Decision::hide(
                post_id,
                HideReason::LinkAuthor,
                PipelineStage::LinkAuthorChecked,
            );
        }

        let post_value = IdentityHasher::post_value(&record.id);
        if !self.policy.less_aggressive_pruning {
            let title_key = IdentityHasher::record_title_key(record);
            if self.check(IndexKind::TitleAuthor, &title_key, &post_value, record) {
                return Decision::hide(
                    post_id,
                    HideReason::TitleAuthor,
                    PipelineStage::TitleAuthorChecked,
                );
            }
        }

        let Some(path) = Self::media_path(post_type) else {
            return Decision::keep(post_id, PipelineStage::TitleAuthorChecked);
        };

        match self.media_hash(record, &path).await {
            Some((hash, reason))
                if self.check(IndexKind::MediaContent, &hash, &post_value, record) =>
            {
                Decision::hide(post_id, reason, PipelineStage::MediaChecked)
            },
            Some(_) => Decision::keep(post_id, PipelineStage::MediaChecked),
            None => {
                tracing::debug!("No media hash, keeping post");
                Decision::keep(post_id, PipelineStage::MediaChecked)
            },
        }
    }
}
