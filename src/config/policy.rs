//! Filter policy: which post categories and signals are active.

use super::StoredSettings;
use crate::models::PostType;
use std::fmt;
use std::time::Duration;

const HOUR_MS: u64 = 60 * 60 * 1_000;
const DAY_MS: u64 = 24 * HOUR_MS;

/// Retention threshold for seen entries.
///
/// Stored as a `0..=5` index by the settings collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeleteThreshold {
    /// 6 hours.
    SixHours,
    /// 1 day.
    #[default]
    OneDay,
    /// 2 days.
    TwoDays,
    /// 7 days.
    OneWeek,
    /// 14 days.
    TwoWeeks,
    /// Entries never expire.
    Never,
}

impl DeleteThreshold {
    /// Maps a stored index to a threshold. Returns `None` when out of range.
    #[must_use]
    pub const fn from_index(index: u64) -> Option<Self> {
        match index {
            0 => Some(Self::SixHours),
            1 => Some(Self::OneDay),
            2 => Some(Self::TwoDays),
            3 => Some(Self::OneWeek),
            4 => Some(Self::TwoWeeks),
            5 => Some(Self::Never),
            _ => None,
        }
    }

    /// Returns the stored index for this threshold.
    #[must_use]
    pub const fn index(&self) -> u8 {
        match self {
            Self::SixHours => 0,
            Self::OneDay => 1,
            Self::TwoDays => 2,
            Self::OneWeek => 3,
            Self::TwoWeeks => 4,
            Self::Never => 5,
        }
    }

    /// Returns the retention in milliseconds, or `None` for never.
    #[must_use]
    pub const fn ttl_ms(&self) -> Option<u64> {
        match self {
            Self::SixHours => Some(6 * HOUR_MS),
            Self::OneDay => Some(DAY_MS),
            Self::TwoDays => Some(2 * DAY_MS),
            Self::OneWeek => Some(7 * DAY_MS),
            Self::TwoWeeks => Some(14 * DAY_MS),
            Self::Never => None,
        }
    }

    /// Returns the retention as a `Duration`, or `None` for never.
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_ms().map(Duration::from_millis)
    }

    /// Returns the human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::SixHours => "6 hours",
            Self::OneDay => "1 day",
            Self::TwoDays => "2 days",
            Self::OneWeek => "1 week",
            Self::TwoWeeks => "2 weeks",
            Self::Never => "Never",
        }
    }
}

impl fmt::Display for DeleteThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Which attribution the link + author index records as its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LinkOwnership {
    /// Hashed community name: the same link resubmitted to another
    /// community is a duplicate.
    #[default]
    Subreddit,
    /// Hashed post id: any second post with the same link is a duplicate.
    Post,
}

impl LinkOwnership {
    /// Parses an ownership variant name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "subreddit" | "community" => Some(Self::Subreddit),
            "post" | "post_id" | "post-id" => Some(Self::Post),
            _ => None,
        }
    }

    /// Returns the variant name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Subreddit => "subreddit",
            Self::Post => "post",
        }
    }
}

/// Read-only filter configuration for a session.
///
/// Built once at session start from the stored settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct FilterPolicy {
    /// Seen-entry retention in milliseconds; `None` never evicts.
    pub delete_threshold_ms: Option<u64>,
    /// Hide every crosspost.
    pub hide_crossposts: bool,
    /// Deduplicate text posts.
    pub hide_text_posts: bool,
    /// Deduplicate link posts.
    pub hide_link_posts: bool,
    /// Deduplicate image and gif posts.
    pub hide_image_posts: bool,
    /// Deduplicate video posts.
    pub hide_video_posts: bool,
    /// Deduplicate gallery posts.
    pub hide_gallery_posts: bool,
    /// Skip the title + author check.
    pub less_aggressive_pruning: bool,
    /// Emit per-post diagnostics.
    pub debug: bool,
    /// Owner value recorded in the link + author index.
    pub link_ownership: LinkOwnership,
}

impl FilterPolicy {
    /// Builds a policy from stored settings.
    #[must_use]
    pub fn from_settings(settings: &StoredSettings, link_ownership: LinkOwnership) -> Self {
        Self {
            delete_threshold_ms: settings.delete_threshold().ttl_ms(),
            hide_crossposts: settings.hide_crossposts,
            hide_text_posts: settings.hide_text_posts,
            hide_link_posts: settings.hide_link_posts,
            hide_image_posts: settings.hide_image_posts,
            hide_video_posts: settings.hide_video_posts,
            hide_gallery_posts: settings.hide_gallery_posts,
            less_aggressive_pruning: settings.less_aggressive_pruning,
            debug: settings.debug_mode,
            link_ownership,
        }
    }

    /// Returns true if posts of this type go through the decision pipeline.
    ///
    /// Unclassified posts are never evaluated.
    #[must_use]
    pub const fn should_evaluate(&self, post_type: PostType) -> bool {
        match post_type {
            PostType::Crosspost => self.hide_crossposts,
            PostType::Text => self.hide_text_posts,
            PostType::Link => self.hide_link_posts,
            PostType::Image | PostType::Gif => self.hide_image_posts,
            PostType::Video => self.hide_video_posts,
            PostType::Gallery => self.hide_gallery_posts,
            PostType::Unknown => false,
        }
    }

    /// Sets the retention threshold.
    #[must_use]
    pub const fn with_delete_threshold(mut self, threshold: DeleteThreshold) -> Self {
        self.delete_threshold_ms = threshold.ttl_ms();
        self
    }

    /// Enables or disables the title + author check skip.
    #[must_use]
    pub const fn with_less_aggressive_pruning(mut self, enabled: bool) -> Self {
        self.less_aggressive_pruning = enabled;
        self
    }

    /// Sets the link ownership variant.
    #[must_use]
    pub const fn with_link_ownership(mut self, ownership: LinkOwnership) -> Self {
        self.link_ownership = ownership;
        self
    }
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self::from_settings(&StoredSettings::default(), LinkOwnership::default())
    }
}
