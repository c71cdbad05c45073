//! HTTP fetch-and-hash collaborator.

use super::{FetchKind, FetchRequest, FetchResponse, MediaFetcher};
use crate::services::IdentityHasher;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Fetches media over HTTP and digests it with SHA-256.
///
/// Non-2xx responses are failures. Digests are truncated to
/// [`IdentityHasher::DIGEST_LEN`] hex characters.
#[derive(Debug, Clone)]
pub struct HttpMediaFetcher {
    client: reqwest::Client,
}

impl HttpMediaFetcher {
    /// Creates a fetcher sending `user_agent`.
    #[must_use]
    pub fn new(user_agent: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }

    /// Creates a fetcher around an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("Fetch failed: {status}"));
        }
        Ok(response)
    }

    async fn digest(&self, url: &str) -> Result<String, String> {
        let mut response = self.get(url).await?;
        let mut hasher = Sha256::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| e.to_string())? {
            hasher.update(&chunk);
        }
        let mut hex = hex::encode(hasher.finalize());
        hex.truncate(IdentityHasher::DIGEST_LEN);
        Ok(hex)
    }

    async fn text(&self, url: &str) -> Result<String, String> {
        self.get(url).await?.text().await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, request: FetchRequest) -> FetchResponse {
        let result = match request.kind {
            FetchKind::Image | FetchKind::Video => {
                self.digest(&request.url).await.map(FetchResponse::hashed)
            },
            FetchKind::GalleryJson => self.text(&request.url).await.map(FetchResponse::manifest),
        };

        result.unwrap_or_else(|error| {
            tracing::debug!(kind = %request.kind, url = %request.url, error = %error, "Media fetch failed");
            FetchResponse::failed(error)
        })
    }
}
