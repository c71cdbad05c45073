//! Remote media hashing.
//!
//! Media bytes are fetched and digested by a [`MediaFetcher`] outside the
//! engine. [`MediaHashOrchestrator`] bounds every request with a timeout and
//! turns any failure into "no hash", so media checks always fail open.

mod gallery;
mod http;
mod orchestrator;

pub use gallery::{gallery_image_urls, manifest_url};
pub use http::HttpMediaFetcher;
pub use orchestrator::MediaHashOrchestrator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a fetch request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FetchKind {
    /// Digest of image bytes.
    Image,
    /// Digest of video bytes.
    Video,
    /// Raw gallery manifest text.
    GalleryJson,
}

impl FetchKind {
    /// Returns the kind as used in logs and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::GalleryJson => "gallery_json",
        }
    }
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Request to the fetch-and-hash collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Requested result.
    pub kind: FetchKind,
    /// Remote resource.
    pub url: String,
}

impl FetchRequest {
    /// Requests an image digest.
    #[must_use]
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            kind: FetchKind::Image,
            url: url.into(),
        }
    }

    /// Requests a video digest.
    #[must_use]
    pub fn video(url: impl Into<String>) -> Self {
        Self {
            kind: FetchKind::Video,
            url: url.into(),
        }
    }

    /// Requests a gallery manifest.
    #[must_use]
    pub fn gallery_json(url: impl Into<String>) -> Self {
        Self {
            kind: FetchKind::GalleryJson,
            url: url.into(),
        }
    }
}

/// Response from the fetch-and-hash collaborator.
///
/// Digest requests fill `hash`, manifest requests fill `json`. On failure
/// both are `None` and `error` describes why.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResponse {
    /// Hex digest of the fetched bytes.
    #[serde(default)]
    pub hash: Option<String>,
    /// Manifest text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<String>,
    /// Failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FetchResponse {
    /// A successful digest response.
    #[must_use]
    pub fn hashed(hash: impl Into<String>) -> Self {
        Self {
            hash: Some(hash.into()),
            ..Self::default()
        }
    }

    /// A successful manifest response.
    #[must_use]
    pub fn manifest(json: impl Into<String>) -> Self {
        Self {
            json: Some(json.into()),
            ..Self::default()
        }
    }

    /// A failed response.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Fetches remote media and digests it.
///
/// Implementations report failures in the response rather than erroring.
/// They are not required to bound their own latency.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Handles one request.
    async fn fetch(&self, request: FetchRequest) -> FetchResponse;
}
