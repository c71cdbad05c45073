//! Per-post decision types.

use super::PostId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a post was hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HideReason {
    /// The post is a crosspost and crossposts are filtered.
    Crosspost,
    /// Same link and author seen under a different attribution.
    LinkAuthor,
    /// Same title and author seen under a different post.
    TitleAuthor,
    /// Byte-identical image seen under a different post.
    Image,
    /// Identical gallery content seen under a different post.
    Gallery,
    /// Byte-identical video seen under a different post.
    Video,
}

impl HideReason {
    /// Returns the reason as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Crosspost => "crosspost",
            Self::LinkAuthor => "link_author",
            Self::TitleAuthor => "title_author",
            Self::Image => "image",
            Self::Gallery => "gallery",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for HideReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Progress of a post through the decision pipeline.
///
/// Stages are ordered by cost; a decision records the last stage that ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Nothing evaluated yet.
    Pending,
    /// Crosspost attribute checked.
    CrosspostChecked,
    /// Link + author index consulted.
    LinkAuthorChecked,
    /// Title + author index consulted (or skipped by policy).
    TitleAuthorChecked,
    /// Media content hashed and consulted.
    MediaChecked,
}

/// Outcome of evaluating one post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// The evaluated post.
    pub post_id: PostId,
    /// Whether the post should be hidden.
    pub hidden: bool,
    /// The signal that triggered the hide.
    pub reason: Option<HideReason>,
    /// The last pipeline stage that ran.
    pub stage: PipelineStage,
}

impl Decision {
    /// Creates a keep decision.
    #[must_use]
    pub const fn keep(post_id: PostId, stage: PipelineStage) -> Self {
        Self {
            post_id,
            hidden: false,
            reason: None,
            stage,
        }
    }

    /// Creates a hide decision.
    #[must_use]
    pub const fn hide(post_id: PostId, reason: HideReason, stage: PipelineStage) -> Self {
        Self {
            post_id,
            hidden: true,
            reason: Some(reason),
            stage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keep_and_hide_constructors() {
        let keep = Decision::keep(PostId::new("a"), PipelineStage::MediaChecked);
        assert!(!keep.hidden);
        assert!(keep.reason.is_none());

        let hide = Decision::hide(
            PostId::new("b"),
            HideReason::LinkAuthor,
            PipelineStage::LinkAuthorChecked,
        );
        assert!(hide.hidden);
        assert_eq!(hide.reason, Some(HideReason::LinkAuthor));
    }

    #[test]
    fn test_stage_ordering_follows_cost() {
        assert!(PipelineStage::Pending < PipelineStage::CrosspostChecked);
        assert!(PipelineStage::LinkAuthorChecked < PipelineStage::TitleAuthorChecked);
        assert!(PipelineStage::TitleAuthorChecked < PipelineStage::MediaChecked);
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(HideReason::TitleAuthor.to_string(), "title_author");
        assert_eq!(HideReason::Gallery.to_string(), "gallery");
    }
}
