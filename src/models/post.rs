//! Post records and identifiers.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Raw identifier of a feed post (the `id` attribute, e.g. `t3_abc123`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    /// Creates a new post ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the post carried no identifier.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PostId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PostId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Category of a feed post, taken from the `post-type` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostType {
    /// A re-share of another post.
    Crosspost,
    /// A self/text post.
    Text,
    /// An outbound link.
    Link,
    /// A single still image.
    Image,
    /// An animated image; shares the image filter flag.
    Gif,
    /// A hosted video.
    Video,
    /// A multi-image gallery.
    Gallery,
    /// Anything the feed reports that we do not classify.
    Unknown,
}

impl PostType {
    /// Parses a post type attribute value. Unrecognized values map to `Unknown`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "crosspost" => Self::Crosspost,
            "text" | "self" => Self::Text,
            "link" => Self::Link,
            "image" => Self::Image,
            "gif" => Self::Gif,
            "video" => Self::Video,
            "gallery" | "multi_media" => Self::Gallery,
            _ => Self::Unknown,
        }
    }

    /// Returns the type as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Crosspost => "crosspost",
            Self::Text => "text",
            Self::Link => "link",
            Self::Image => "image",
            Self::Gif => "gif",
            Self::Video => "video",
            Self::Gallery => "gallery",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A post element as exposed by the feed markup.
///
/// Field names follow the element attributes. Missing or `null` attributes
/// deserialize to empty strings and are hashed like any other value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    /// Raw post identifier.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub id: String,
    /// Raw `post-type` attribute.
    #[serde(default, rename = "post-type", deserialize_with = "null_as_empty")]
    pub post_type: String,
    /// Link the post points at (media URL, outbound link, or permalink).
    #[serde(default, rename = "content-href", deserialize_with = "null_as_empty")]
    pub content_href: String,
    /// Submitting account.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub author: String,
    /// Post title.
    #[serde(default, rename = "post-title", deserialize_with = "null_as_empty")]
    pub post_title: String,
    /// Community the post was submitted to.
    #[serde(default, rename = "subreddit-name", deserialize_with = "null_as_empty")]
    pub subreddit_name: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl PostRecord {
    /// Creates a record with an id and type; remaining attributes are empty.
    #[must_use]
    pub fn new(id: impl Into<String>, post_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            post_type: post_type.into(),
            ..Self::default()
        }
    }

    /// Sets the content link.
    #[must_use]
    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.content_href = href.into();
        self
    }

    /// Sets the author.
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.post_title = title.into();
        self
    }

    /// Sets the community name.
    #[must_use]
    pub fn with_subreddit(mut self, subreddit: impl Into<String>) -> Self {
        self.subreddit_name = subreddit.into();
        self
    }

    /// Returns the post identifier.
    #[must_use]
    pub fn post_id(&self) -> PostId {
        PostId::new(self.id.clone())
    }

    /// Returns the parsed post category.
    #[must_use]
    pub fn kind(&self) -> PostType {
        PostType::parse(&self.post_type)
    }

    /// Returns true if the content link points at a `.gif` or `.gifv` file.
    ///
    /// Query strings and fragments are ignored.
    #[must_use]
    pub fn links_to_gif(&self) -> bool {
        let href = self.content_href.to_lowercase();
        let path = href.split(['?', '#']).next().unwrap_or_default();
        path.ends_with(".gif") || path.ends_with(".gifv")
    }
}
