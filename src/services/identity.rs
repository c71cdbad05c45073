//! Identity key derivation.
//!
//! Every key and owner value persisted by the engine is a SHA-256 digest
//! truncated to [`IdentityHasher::DIGEST_LEN`] hex characters. Composite keys
//! hash each field first and join the field digests with `|`, so no choice
//! of field contents can make two different field tuples collide on the
//! joined string.

use crate::models::PostRecord;
use sha2::{Digest, Sha256};

/// Derives privacy-preserving identity keys from post attributes.
///
/// # Example
///
/// ```rust
/// use feedsift::IdentityHasher;
///
/// let a = IdentityHasher::link_author_key("https://EXAMPLE.com/x", "Alice");
/// let b = IdentityHasher::link_author_key("https://example.com/x", "alice");
/// assert_eq!(a, b);
/// assert_eq!(a.len(), IdentityHasher::DIGEST_LEN);
/// ```
pub struct IdentityHasher;

impl IdentityHasher {
    /// Length in hex characters of every persisted digest.
    pub const DIGEST_LEN: usize = 32;

    /// Field delimiter for composite keys.
    pub const DELIMITER: char = '|';

    /// Hashes a string. Case normalization is the caller's responsibility.
    #[must_use]
    pub fn hash(data: &str) -> String {
        Self::hash_bytes(data.as_bytes())
    }

    /// Hashes raw bytes.
    #[must_use]
    pub fn hash_bytes(data: &[u8]) -> String {
        let digest = Sha256::digest(data);
        let mut hex = hex::encode(digest);
        hex.truncate(Self::DIGEST_LEN);
        hex
    }

    /// Normalizes a digest produced elsewhere to the persisted form.
    ///
    /// Returns `None` if `digest` is not hex or is shorter than
    /// [`Self::DIGEST_LEN`].
    #[must_use]
    pub fn normalize_digest(digest: &str) -> Option<String> {
        let digest = digest.trim();
        if digest.len() < Self::DIGEST_LEN || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(digest[..Self::DIGEST_LEN].to_ascii_lowercase())
    }

    /// Lower-cases a text field before hashing.
    #[must_use]
    pub fn normalize(text: &str) -> String {
        text.to_lowercase()
    }

    /// Composes a key from two fields: `hash(hash(a) | hash(b))`.
    ///
    /// Fields are hashed as given.
    #[must_use]
    pub fn compose(a: &str, b: &str) -> String {
        let joined = format!("{}{}{}", Self::hash(a), Self::DELIMITER, Self::hash(b));
        Self::hash(&joined)
    }

    /// Combines per-image digests into one order-independent gallery digest.
    ///
    /// Digests are sorted before concatenation. Returns `None` for an empty
    /// gallery.
    #[must_use]
    pub fn combine_unordered(mut digests: Vec<String>) -> Option<String> {
        if digests.is_empty() {
            return None;
        }
        digests.sort_unstable();
        Some(Self::hash(&digests.concat()))
    }

    /// Key for the link + author index.
    #[must_use]
    pub fn link_author_key(content_href: &str, author: &str) -> String {
        Self::compose(&Self::normalize(content_href), &Self::normalize(author))
    }

    /// Key for the title + author index.
    #[must_use]
    pub fn title_author_key(title: &str, author: &str) -> String {
        Self::compose(&Self::normalize(title), &Self::normalize(author))
    }

    /// Owner value for a community name.
    #[must_use]
    pub fn community_value(subreddit: &str) -> String {
        Self::hash(&Self::normalize(subreddit))
    }

    /// Owner value for a post identifier. Identifiers are hashed verbatim.
    #[must_use]
    pub fn post_value(post_id: &str) -> String {
        Self::hash(post_id)
    }

    /// Link + author key for a record.
    #[must_use]
    pub fn record_link_key(record: &PostRecord) -> String {
        Self::link_author_key(&record.content_href, &record.author)
    }

    /// Title + author key for a record.
    #[must_use]
    pub fn record_title_key(record: &PostRecord) -> String {
        Self::title_author_key(&record.post_title, &record.author)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_length_and_charset() {
        let hash = IdentityHasher::hash("anything");
        assert_eq!(hash.len(), 32);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_hash_is_sha256_prefix() {
        // sha256("abc")
        assert_eq!(
            IdentityHasher::hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223"
        );
    }

    #[test]
    fn test_hash_does_not_normalize() {
        assert_ne!(IdentityHasher::hash("Abc"), IdentityHasher::hash("abc"));
    }

    #[test]
    fn test_compose_is_field_bound() {
        // "a|b" + "c" and "a" + "b|c" join to the same raw string
        assert_ne!(
            IdentityHasher::compose("a|b", "c"),
            IdentityHasher::compose("a", "b|c")
        );
        assert_ne!(
            IdentityHasher::compose("ab", "c"),
            IdentityHasher::compose("a", "bc")
        );
    }

    #[test]
    fn test_link_author_key_case_insensitive() {
        assert_eq!(
            IdentityHasher::link_author_key("HTTPS://i.example.com/A.png", "SomeOne"),
            IdentityHasher::link_author_key("https://i.example.com/a.png", "someone")
        );
    }

    #[test]
    fn test_link_and_title_keys_agree_for_same_fields() {
        assert_eq!(
            IdentityHasher::link_author_key("x", "y"),
            IdentityHasher::title_author_key("X", "Y")
        );
    }

    #[test]
    fn test_empty_fields_hash_normally() {
        let key = IdentityHasher::link_author_key("", "");
        assert_eq!(key.len(), 32);
    }

    #[test]
    fn test_combine_unordered() {
        let a = IdentityHasher::hash("one");
        let b = IdentityHasher::hash("two");
        assert_eq!(
            IdentityHasher::combine_unordered(vec![a.clone(), b.clone()]),
            IdentityHasher::combine_unordered(vec![b, a])
        );
        assert!(IdentityHasher::combine_unordered(Vec::new()).is_none());
    }

    #[test]
    fn test_normalize_digest() {
        let full = "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD";
        assert_eq!(
            IdentityHasher::normalize_digest(full).as_deref(),
            Some("ba7816bf8f01cfea414140de5dae2223")
        );
        assert!(IdentityHasher::normalize_digest("abc").is_none());
        assert!(IdentityHasher::normalize_digest(&"z".repeat(32)).is_none());
    }

    #[test]
    fn test_post_value_keeps_case() {
        assert_ne!(
            IdentityHasher::post_value("t3_AbC"),
            IdentityHasher::post_value("t3_abc")
        );
        assert_eq!(
            IdentityHasher::community_value("Pics"),
            IdentityHasher::community_value("pics")
        );
    }
}
