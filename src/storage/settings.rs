//! Filter settings read through the key-value store.

use super::{KeyValueStore, Record};
use crate::config::StoredSettings;
use crate::config::settings::SETTING_KEYS;
use crate::Result;
use std::sync::Arc;

/// Reads and writes [`StoredSettings`] in a key-value store.
#[derive(Clone)]
pub struct SettingsSource {
    store: Arc<dyn KeyValueStore>,
}

impl SettingsSource {
    /// Creates a settings source over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Loads settings; absent or invalid keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn load(&self) -> Result<StoredSettings> {
        let record = self.store.get(SETTING_KEYS).await?;
        Ok(StoredSettings::from_record(&record))
    }

    /// Loads settings, falling back to defaults when the store fails.
    pub async fn load_or_default(&self) -> StoredSettings {
        match self.load().await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read settings, using defaults");
                StoredSettings::default()
            },
        }
    }

    /// Validates and stores one setting, returning the updated settings.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for unknown keys or bad values, or a storage
    /// error if the write fails.
    pub async fn set(&self, key: &str, raw: &str) -> Result<StoredSettings> {
        let value = StoredSettings::parse_value(key, raw)?;
        let mut record = Record::new();
        record.insert(key.to_string(), value);
        self.store.set(record).await?;
        self.load().await
    }

    /// Writes every setting.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn save(&self, settings: &StoredSettings) -> Result<()> {
        self.store.set(settings.to_record()).await
    }
}

impl std::fmt::Debug for SettingsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsSource").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeleteThreshold;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn test_load_defaults_from_empty_store() {
        let source = SettingsSource::new(Arc::new(MemoryStore::new()));
        assert_eq!(source.load().await.unwrap(), StoredSettings::default());
    }

    #[tokio::test]
    async fn test_set_then_load() {
        let source = SettingsSource::new(Arc::new(MemoryStore::new()));
        let updated = source.set("deleteThreshold", "0").await.unwrap();
        assert_eq!(updated.delete_threshold(), DeleteThreshold::SixHours);

        let updated = source.set("lessAggressivePruning", "true").await.unwrap();
        assert!(updated.less_aggressive_pruning);
        assert_eq!(updated.delete_threshold(), DeleteThreshold::SixHours);
    }

    #[tokio::test]
    async fn test_set_rejects_bad_values_without_writing() {
        let store = Arc::new(MemoryStore::new());
        let source = SettingsSource::new(store.clone());
        assert!(source.set("deleteThreshold", "12").await.is_err());
        assert!(source.set("nope", "true").await.is_err());
        assert!(store.snapshot().is_empty());
    }
}
