//! Timeout-bounded media hashing.

use super::{FetchKind, FetchRequest, FetchResponse, MediaFetcher, gallery};
use crate::config::{DEFAULT_GALLERY_ORIGIN, DEFAULT_MEDIA_TIMEOUT_MS};
use crate::services::IdentityHasher;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Resolves media content hashes through a [`MediaFetcher`].
///
/// Every request is bounded by `timeout`. An elapsed budget abandons the
/// wait but not the underlying request. Timeouts, transport errors and
/// malformed responses all resolve to `None`.
#[derive(Clone)]
pub struct MediaHashOrchestrator {
    fetcher: Arc<dyn MediaFetcher>,
    timeout: Duration,
    gallery_origin: String,
}

impl MediaHashOrchestrator {
    /// Creates an orchestrator with the default budget and gallery origin.
    #[must_use]
    pub fn new(fetcher: Arc<dyn MediaFetcher>) -> Self {
        Self {
            fetcher,
            timeout: Duration::from_millis(DEFAULT_MEDIA_TIMEOUT_MS),
            gallery_origin: DEFAULT_GALLERY_ORIGIN.to_string(),
        }
    }

    /// Sets the per-request budget.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the origin gallery manifests are fetched from.
    #[must_use]
    pub fn with_gallery_origin(mut self, origin: impl Into<String>) -> Self {
        self.gallery_origin = origin.into();
        self
    }

    /// Returns the per-request budget.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Hashes a single image.
    pub async fn image_hash(&self, url: &str) -> Option<String> {
        self.digest(FetchRequest::image(url)).await
    }

    /// Hashes a single video.
    pub async fn video_hash(&self, url: &str) -> Option<String> {
        self.digest(FetchRequest::video(url)).await
    }

    /// Computes the order-independent combined hash of a gallery.
    ///
    /// Returns `None` if the manifest cannot be resolved, lists no images, or
    /// any image fails to hash.
    #[instrument(skip(self), fields(operation = "gallery_hash"))]
    pub async fn gallery_hash(&self, post_id: &str) -> Option<String> {
        if post_id.is_empty() {
            return None;
        }

        let url = gallery::manifest_url(&self.gallery_origin, post_id);
        let manifest = self.request(FetchRequest::gallery_json(url)).await?.json?;

        let Some(urls) = gallery::gallery_image_urls(&manifest) else {
            tracing::debug!(post_id, "Malformed gallery manifest");
            return None;
        };
        if urls.is_empty() {
            tracing::debug!(post_id, "Gallery lists no images");
            return None;
        }

        let hashes: Option<Vec<String>> = join_all(urls.iter().map(|u| self.image_hash(u)))
            .await
            .into_iter()
            .collect();

        let Some(hashes) = hashes else {
            tracing::debug!(post_id, images = urls.len(), "Gallery image failed to hash");
            return None;
        };
        IdentityHasher::combine_unordered(hashes)
    }

    async fn digest(&self, request: FetchRequest) -> Option<String> {
        if request.url.is_empty() {
            return None;
        }
        let response = self.request(request).await?;
        let hash = response.hash?;
        let normalized = IdentityHasher::normalize_digest(&hash);
        if normalized.is_none() {
            tracing::debug!(hash = %hash, "Discarding malformed digest");
        }
        normalized
    }

    #[instrument(skip(self, request), fields(kind = %request.kind, url = %request.url))]
    async fn request(&self, request: FetchRequest) -> Option<FetchResponse> {
        let kind = request.kind;
        match tokio::time::timeout(self.timeout, self.fetcher.fetch(request)).await {
            Ok(response) if response.error.is_none() && has_payload(kind, &response) => {
                count_request(kind, "ok");
                Some(response)
            },
            Ok(response) => {
                count_request(kind, "error");
                tracing::debug!(error = ?response.error, "Media request failed");
                None
            },
            Err(_) => {
                count_request(kind, "timeout");
                tracing::debug!(
                    timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                    "Media request timed out"
                );
                None
            },
        }
    }
}

const fn has_payload(kind: FetchKind, response: &FetchResponse) -> bool {
    match kind {
        FetchKind::Image | FetchKind::Video => response.hash.is_some(),
        FetchKind::GalleryJson => response.json.is_some(),
    }
}

fn count_request(kind: FetchKind, outcome: &'static str) {
    metrics::counter!(
        "feedsift_media_requests_total",
        "kind" => kind.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

impl std::fmt::Debug for MediaHashOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaHashOrchestrator")
            .field("timeout", &self.timeout)
            .field("gallery_origin", &self.gallery_origin)
            .finish_non_exhaustive()
    }
}
