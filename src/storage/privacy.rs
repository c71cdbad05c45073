//! Private browsing context detection.

use async_trait::async_trait;

/// Reports whether the engine runs in a private browsing context.
#[async_trait]
pub trait PrivacyModeProbe: Send + Sync {
    /// Returns true for a private context.
    async fn is_private(&self) -> bool;
}

/// A probe with a fixed answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticPrivacyMode {
    private: bool,
}

impl StaticPrivacyMode {
    /// Creates a probe that always answers `private`.
    #[must_use]
    pub const fn new(private: bool) -> Self {
        Self { private }
    }
}

#[async_trait]
impl PrivacyModeProbe for StaticPrivacyMode {
    async fn is_private(&self) -> bool {
        self.private
    }
}
