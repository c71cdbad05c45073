//! Seen-entry index types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stored `(value, timestamp)` pair recording the first observed owner of
/// an identity key.
///
/// `value` is always a one-way hash (of a community name or a post id),
/// never raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenEntry {
    /// Hashed owner of the identity.
    pub value: String,
    /// When the identity was first observed (Unix epoch milliseconds).
    pub timestamp: u64,
}

impl SeenEntry {
    /// Creates a new entry.
    #[must_use]
    pub fn new(value: impl Into<String>, timestamp: u64) -> Self {
        Self {
            value: value.into(),
            timestamp,
        }
    }

    /// Returns true if the entry is at least `ttl_ms` old at `now`.
    #[must_use]
    pub const fn is_expired(&self, now: u64, ttl_ms: u64) -> bool {
        now.saturating_sub(self.timestamp) >= ttl_ms
    }
}

/// The three independent seen-entry indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// `hash(hash(link) | hash(author))` -> hashed attribution.
    LinkAuthor,
    /// `hash(hash(title) | hash(author))` -> hashed post id.
    TitleAuthor,
    /// Media content hash -> hashed post id.
    MediaContent,
}

impl IndexKind {
    /// Returns all index kinds in pipeline order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::LinkAuthor, Self::TitleAuthor, Self::MediaContent]
    }

    /// Returns the key the index is persisted under.
    #[must_use]
    pub const fn storage_key(&self) -> &'static str {
        match self {
            Self::LinkAuthor => "seenPostsSubreddit",
            Self::TitleAuthor => "seenPostsID",
            Self::MediaContent => "seenPostsMedia",
        }
    }

    /// Returns the index name used in logs and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LinkAuthor => "link_author",
            Self::TitleAuthor => "title_author",
            Self::MediaContent => "media_content",
        }
    }

    /// Returns every persisted storage key.
    #[must_use]
    pub fn storage_keys() -> Vec<&'static str> {
        Self::all().iter().map(Self::storage_key).collect()
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
