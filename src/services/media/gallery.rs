//! Gallery manifest resolution.
//!
//! A gallery's image list comes from the post's listing JSON:
//! `gallery_data.items` gives the display order and `media_metadata` maps each
//! `media_id` to its source rendition under `s.u` (or `s.gif` for animated
//! items).

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Returns the manifest URL for a gallery post.
///
/// The `t3_` kind prefix is stripped from `post_id`.
#[must_use]
pub fn manifest_url(origin: &str, post_id: &str) -> String {
    let id = post_id.strip_prefix("t3_").unwrap_or(post_id);
    format!("{}/comments/{id}.json", origin.trim_end_matches('/'))
}

#[derive(Debug, Deserialize)]
struct GalleryPost {
    #[serde(default)]
    gallery_data: Option<GalleryData>,
    #[serde(default)]
    media_metadata: Option<HashMap<String, MediaMetadata>>,
}

#[derive(Debug, Deserialize)]
struct GalleryData {
    #[serde(default)]
    items: Vec<GalleryItem>,
}

#[derive(Debug, Deserialize)]
struct GalleryItem {
    media_id: String,
}

#[derive(Debug, Deserialize)]
struct MediaMetadata {
    #[serde(default)]
    s: Option<MediaSource>,
}

#[derive(Debug, Deserialize)]
struct MediaSource {
    #[serde(default)]
    u: Option<String>,
    #[serde(default)]
    gif: Option<String>,
}

/// Extracts image URLs from manifest text, in gallery order.
///
/// Returns `None` if the text is not a recognizable post listing. Items
/// without a source rendition are skipped.
#[must_use]
pub fn gallery_image_urls(manifest: &str) -> Option<Vec<String>> {
    let root: Value = serde_json::from_str(manifest).ok()?;
    let post: GalleryPost = serde_json::from_value(locate_post(&root)?.clone()).ok()?;

    let metadata = post.media_metadata.unwrap_or_default();
    let items = post.gallery_data.map(|g| g.items).unwrap_or_default();

    Some(
        items
            .iter()
            .filter_map(|item| metadata.get(&item.media_id)?.s.as_ref())
            .filter_map(|source| source.u.as_ref().or(source.gif.as_ref()))
            .map(|url| url.replace("&amp;", "&"))
            .collect(),
    )
}

// `[listing, comments]`, a bare listing, or the post object itself.
fn locate_post(root: &Value) -> Option<&Value> {
    let listing = match root {
        Value::Array(parts) => parts.first()?,
        other => other,
    };
    if listing.get("gallery_data").is_some() || listing.get("media_metadata").is_some() {
        return Some(listing);
    }
    listing.pointer("/data/children/0/data")
}
