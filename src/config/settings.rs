//! Filter settings as held by the settings collaborator.
//!
//! Settings live in the persistent key-value store under fixed key names,
//! next to the seen-entry indices. Missing or mistyped values fall back to
//! their defaults individually.

use super::DeleteThreshold;
use crate::{Error, Result};
use serde_json::{Map, Value};

/// Stored key for the retention threshold index (`0..=5`).
pub const DELETE_THRESHOLD: &str = "deleteThreshold";
/// Stored key for the crosspost filter.
pub const HIDE_CROSSPOSTS: &str = "hideCrossposts";
/// Stored key for the text post filter.
pub const HIDE_TEXT_POSTS: &str = "hideTextPosts";
/// Stored key for the link post filter.
pub const HIDE_LINK_POSTS: &str = "hideLinkPosts";
/// Stored key for the image post filter.
pub const HIDE_IMAGE_POSTS: &str = "hideImagePosts";
/// Stored key for the video post filter.
pub const HIDE_VIDEO_POSTS: &str = "hideVideoPosts";
/// Stored key for the gallery post filter.
pub const HIDE_GALLERY_POSTS: &str = "hideGalleryPosts";
/// Stored key for skipping the title + author check.
pub const LESS_AGGRESSIVE_PRUNING: &str = "lessAggressivePruning";
/// Stored key for debug diagnostics.
pub const DEBUG_MODE: &str = "debugMode";
/// Stored key for running only in private browsing contexts.
pub const INCOGNITO_EXCLUSIVE_MODE: &str = "incognitoExclusiveMode";

/// All setting keys, in display order.
pub const SETTING_KEYS: &[&str] = &[
    DELETE_THRESHOLD,
    HIDE_CROSSPOSTS,
    HIDE_TEXT_POSTS,
    HIDE_LINK_POSTS,
    HIDE_IMAGE_POSTS,
    HIDE_VIDEO_POSTS,
    HIDE_GALLERY_POSTS,
    LESS_AGGRESSIVE_PRUNING,
    DEBUG_MODE,
    INCOGNITO_EXCLUSIVE_MODE,
];

/// Filter settings record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct StoredSettings {
    /// Retention threshold index.
    pub delete_threshold: u8,
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
    pub debug_mode: bool,
    /// Only run in private browsing contexts.
    pub incognito_exclusive_mode: bool,
}

impl Default for StoredSettings {
    fn default() -> Self {
        Self {
            delete_threshold: DeleteThreshold::default().index(),
            hide_crossposts: true,
            hide_text_posts: true,
            hide_link_posts: true,
            hide_image_posts: true,
            hide_video_posts: true,
            hide_gallery_posts: true,
            less_aggressive_pruning: false,
            debug_mode: false,
            incognito_exclusive_mode: false,
        }
    }
}

impl StoredSettings {
    /// Builds settings from a key-value record.
    #[must_use]
    pub fn from_record(record: &Map<String, Value>) -> Self {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| {
            record.get(key).and_then(Value::as_bool).unwrap_or(default)
        };

        let delete_threshold = record
            .get(DELETE_THRESHOLD)
            .and_then(Value::as_u64)
            .and_then(DeleteThreshold::from_index)
            .map_or(defaults.delete_threshold, |t| t.index());

        Self {
            delete_threshold,
            hide_crossposts: flag(HIDE_CROSSPOSTS, defaults.hide_crossposts),
            hide_text_posts: flag(HIDE_TEXT_POSTS, defaults.hide_text_posts),
            hide_link_posts: flag(HIDE_LINK_POSTS, defaults.hide_link_posts),
            hide_image_posts: flag(HIDE_IMAGE_POSTS, defaults.hide_image_posts),
            hide_video_posts: flag(HIDE_VIDEO_POSTS, defaults.hide_video_posts),
            hide_gallery_posts: flag(HIDE_GALLERY_POSTS, defaults.hide_gallery_posts),
            less_aggressive_pruning: flag(LESS_AGGRESSIVE_PRUNING, defaults.less_aggressive_pruning),
            debug_mode: flag(DEBUG_MODE, defaults.debug_mode),
            incognito_exclusive_mode: flag(
                INCOGNITO_EXCLUSIVE_MODE,
                defaults.incognito_exclusive_mode,
            ),
        }
    }

    /// Converts settings to a key-value record.
    #[must_use]
    pub fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert(DELETE_THRESHOLD.to_string(), Value::from(self.delete_threshold));
        for key in &SETTING_KEYS[1..] {
            if let Some(value) = self.flag(key) {
                record.insert((*key).to_string(), Value::Bool(value));
            }
        }
        record
    }

    /// Returns the retention threshold.
    #[must_use]
    pub fn delete_threshold(&self) -> DeleteThreshold {
        DeleteThreshold::from_index(u64::from(self.delete_threshold)).unwrap_or_default()
    }

    /// Returns a boolean setting by key name.
    #[must_use]
    pub fn flag(&self, key: &str) -> Option<bool> {
        match key {
            HIDE_CROSSPOSTS => Some(self.hide_crossposts),
            HIDE_TEXT_POSTS => Some(self.hide_text_posts),
            HIDE_LINK_POSTS => Some(self.hide_link_posts),
            HIDE_IMAGE_POSTS => Some(self.hide_image_posts),
            HIDE_VIDEO_POSTS => Some(self.hide_video_posts),
            HIDE_GALLERY_POSTS => Some(self.hide_gallery_posts),
            LESS_AGGRESSIVE_PRUNING => Some(self.less_aggressive_pruning),
            DEBUG_MODE => Some(self.debug_mode),
            INCOGNITO_EXCLUSIVE_MODE => Some(self.incognito_exclusive_mode),
            _ => None,
        }
    }

    /// Parses a raw value for a setting key into its stored JSON form.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for unknown keys, non-boolean flag values, and
    /// thresholds outside `0..=5`.
    pub fn parse_value(key: &str, raw: &str) -> Result<Value> {
        if key == DELETE_THRESHOLD {
            let index = raw
                .trim()
                .parse::<u64>()
                .ok()
                .and_then(DeleteThreshold::from_index)
                .ok_or_else(|| {
                    Error::InvalidInput(format!("{key} must be an integer 0-5, got '{raw}'"))
                })?;
            return Ok(Value::from(index.index()));
        }

        if !SETTING_KEYS.contains(&key) {
            return Err(Error::InvalidInput(format!("unknown setting '{key}'")));
        }

        match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "on" | "yes" => Ok(Value::Bool(true)),
            "false" | "0" | "off" | "no" => Ok(Value::Bool(false)),
            _ => Err(Error::InvalidInput(format!(
                "{key} must be true or false, got '{raw}'"
            ))),
        }
    }
}
