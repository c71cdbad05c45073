//! Configuration management.
//!
//! Two layers: the runtime [`FeedsiftConfig`] (TOML file plus `FEEDSIFT_*`
//! environment overrides) and the filter [`StoredSettings`] kept in the
//! persistent key-value store next to the seen-entry indices.

mod policy;
pub mod settings;

pub use policy::{DeleteThreshold, FilterPolicy, LinkOwnership};
pub use settings::StoredSettings;

use crate::observability::LogFormat;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default per-request media budget.
pub const DEFAULT_MEDIA_TIMEOUT_MS: u64 = 5_000;
/// Default quiet period before a batch scan fires.
pub const DEFAULT_DEBOUNCE_MS: u64 = 50;
/// Default origin gallery manifests are fetched from.
pub const DEFAULT_GALLERY_ORIGIN: &str = "https://www.reddit.com";
/// Default metrics listener port.
pub const DEFAULT_METRICS_PORT: u16 = 9464;

/// Main configuration for feedsift.
#[derive(Debug, Clone)]
pub struct FeedsiftConfig {
    /// Directory holding the persistent store.
    pub data_dir: PathBuf,
    /// File name of the persistent store inside `data_dir`.
    pub storage_file: String,
    /// Remote fetch-and-hash settings.
    pub media: MediaConfig,
    /// Batch scan settings.
    pub scan: ScanConfig,
    /// Owner value recorded in the link + author index.
    pub link_ownership: LinkOwnership,
    /// Log output settings.
    pub logging: LoggingSettings,
    /// Prometheus exporter settings.
    pub metrics: MetricsSettings,
}

/// Remote fetch-and-hash settings.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Budget for each fetch; an elapsed budget resolves to "no hash".
    pub timeout: Duration,
    /// Origin that serves gallery manifests.
    pub gallery_origin: String,
    /// User agent sent with fetches.
    pub user_agent: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_MEDIA_TIMEOUT_MS),
            gallery_origin: DEFAULT_GALLERY_ORIGIN.to_string(),
            user_agent: format!("feedsift/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Batch scan settings.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Quiet period after the last mutation notification.
    pub debounce: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Default)]
pub struct LoggingSettings {
    /// Output format.
    pub format: LogFormat,
    /// Optional append-only log file.
    pub file: Option<PathBuf>,
}

/// Prometheus exporter settings.
#[derive(Debug, Clone)]
pub struct MetricsSettings {
    /// Whether to start the HTTP listener.
    pub enabled: bool,
    /// Listener port.
    pub port: u16,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            port: DEFAULT_METRICS_PORT,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Store file name.
    pub storage_file: Option<String>,
    /// Link ownership variant.
    pub link_ownership: Option<String>,
    /// Media section.
    pub media: Option<ConfigFileMedia>,
    /// Scan section.
    pub scan: Option<ConfigFileScan>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
    /// Metrics section.
    pub metrics: Option<ConfigFileMetrics>,
}

/// Media section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileMedia {
    /// Fetch budget in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Gallery manifest origin.
    pub gallery_origin: Option<String>,
    /// User agent.
    pub user_agent: Option<String>,
}

/// Scan section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileScan {
    /// Debounce window in milliseconds.
    pub debounce_ms: Option<u64>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

/// Metrics section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileMetrics {
    /// Whether to start the exporter.
    pub enabled: Option<bool>,
    /// Listener port.
    pub port: Option<u16>,
}

impl Default for FeedsiftConfig {
    fn default() -> Self {
        let data_dir = directories::ProjectDirs::from("", "", "feedsift")
            .map_or_else(|| PathBuf::from(".feedsift"), |d| d.data_dir().to_path_buf());
        Self {
            data_dir,
            storage_file: "storage.json".to_string(),
            media: MediaConfig::default(),
            scan: ScanConfig::default(),
            link_ownership: LinkOwnership::default(),
            logging: LoggingSettings::default(),
            metrics: MetricsSettings::default(),
        }
    }
}

impl FeedsiftConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::operation("read_config_file", e))?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or carries an invalid
    /// enumerated value.
    pub fn from_toml(contents: &str) -> crate::Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| crate::Error::operation("parse_config_file", e))?;
        Self::from_config_file(file)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the platform config dir, then `~/.config/feedsift/`. Returns
    /// defaults if neither holds a readable file.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("feedsift").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("feedsift")
                .join("config.toml"),
        ];

        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Ignoring config file"),
            }
        }

        Self::default()
    }

    /// Applies `FEEDSIFT_*` overrides from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies `FEEDSIFT_*` overrides from a lookup function.
    ///
    /// Unparseable values are logged and ignored.
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("FEEDSIFT_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("FEEDSIFT_STORAGE_FILE") {
            self.storage_file = v;
        }
        if let Some(v) = lookup("FEEDSIFT_LINK_OWNERSHIP") {
            match LinkOwnership::parse(&v) {
                Some(o) => self.link_ownership = o,
                None => tracing::warn!(value = %v, "Ignoring FEEDSIFT_LINK_OWNERSHIP"),
            }
        }
        if let Some(ms) = parse_env::<u64>(&lookup, "FEEDSIFT_MEDIA_TIMEOUT_MS") {
            self.media.timeout = Duration::from_millis(ms);
        }
        if let Some(v) = lookup("FEEDSIFT_GALLERY_ORIGIN") {
            self.media.gallery_origin = v;
        }
        if let Some(v) = lookup("FEEDSIFT_USER_AGENT") {
            self.media.user_agent = v;
        }
        if let Some(ms) = parse_env::<u64>(&lookup, "FEEDSIFT_DEBOUNCE_MS") {
            self.scan.debounce = Duration::from_millis(ms);
        }
        if let Some(v) = lookup("FEEDSIFT_LOG_FORMAT") {
            self.logging.format = LogFormat::parse(&v);
        }
        if let Some(v) = lookup("FEEDSIFT_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(v));
        }
        if let Some(enabled) = parse_env::<bool>(&lookup, "FEEDSIFT_METRICS_ENABLED") {
            self.metrics.enabled = enabled;
        }
        if let Some(port) = parse_env::<u16>(&lookup, "FEEDSIFT_METRICS_PORT") {
            self.metrics.port = port;
        }
        self
    }

    fn from_config_file(file: ConfigFile) -> crate::Result<Self> {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(storage_file) = file.storage_file {
            config.storage_file = storage_file;
        }
        if let Some(ownership) = file.link_ownership {
            config.link_ownership = LinkOwnership::parse(&ownership).ok_or_else(|| {
                crate::Error::InvalidInput(format!("unknown link_ownership '{ownership}'"))
            })?;
        }
        if let Some(media) = file.media {
            if let Some(ms) = media.timeout_ms {
                config.media.timeout = Duration::from_millis(ms);
            }
            if let Some(origin) = media.gallery_origin {
                config.media.gallery_origin = origin;
            }
            if let Some(agent) = media.user_agent {
                config.media.user_agent = agent;
            }
        }
        if let Some(ms) = file.scan.and_then(|s| s.debounce_ms) {
            config.scan.debounce = Duration::from_millis(ms);
        }
        if let Some(logging) = file.logging {
            if let Some(format) = logging.format {
                config.logging.format = LogFormat::parse(&format);
            }
            config.logging.file = logging.file.map(PathBuf::from);
        }
        if let Some(metrics) = file.metrics {
            if let Some(enabled) = metrics.enabled {
                config.metrics.enabled = enabled;
            }
            if let Some(port) = metrics.port {
                config.metrics.port = port;
            }
        }

        Ok(config)
    }

    /// Returns the full path of the persistent store file.
    #[must_use]
    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join(&self.storage_file)
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Sets the media fetch budget.
    #[must_use]
    pub const fn with_media_timeout(mut self, timeout: Duration) -> Self {
        self.media.timeout = timeout;
        self
    }

    /// Sets the debounce window.
    #[must_use]
    pub const fn with_debounce(mut self, debounce: Duration) -> Self {
        self.scan.debounce = debounce;
        self
    }

    /// Sets the link ownership variant.
    #[must_use]
    pub const fn with_link_ownership(mut self, ownership: LinkOwnership) -> Self {
        self.link_ownership = ownership;
        self
    }
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    let parsed = raw.trim().parse().ok();
    if parsed.is_none() {
        tracing::warn!(key, value = %raw, "Ignoring unparseable environment override");
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = FeedsiftConfig::default();
        assert_eq!(config.storage_file, "storage.json");
        assert_eq!(config.media.timeout, Duration::from_secs(5));
        assert_eq!(config.media.gallery_origin, "https://www.reddit.com");
        assert_eq!(config.scan.debounce, Duration::from_millis(50));
        assert_eq!(config.link_ownership, LinkOwnership::Subreddit);
        assert!(!config.metrics.enabled);
        assert!(config.storage_path().ends_with("storage.json"));
    }

    #[test]
    fn test_from_toml() {
        let config = FeedsiftConfig::from_toml(
            r#"
            data_dir = "/tmp/fs"
            link_ownership = "post"

            [media]
            timeout_ms = 250
            gallery_origin = "http://localhost:8080"

            [scan]
            debounce_ms = 10

            [logging]
            format = "json"

            [metrics]
            enabled = true
            port = 9100
            "#,
        )
        .unwrap();

        assert_eq!(config.storage_path(), PathBuf::from("/tmp/fs/storage.json"));
        assert_eq!(config.link_ownership, LinkOwnership::Post);
        assert_eq!(config.media.timeout, Duration::from_millis(250));
        assert_eq!(config.media.gallery_origin, "http://localhost:8080");
        assert_eq!(config.scan.debounce, Duration::from_millis(10));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.port, 9100);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(FeedsiftConfig::from_toml("data_dir = [").is_err());
        assert!(FeedsiftConfig::from_toml("link_ownership = \"owner\"").is_err());
        assert!(FeedsiftConfig::from_toml("unknown_key = 1").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("FEEDSIFT_DATA_DIR", "/var/fs"),
            ("FEEDSIFT_MEDIA_TIMEOUT_MS", "1200"),
            ("FEEDSIFT_DEBOUNCE_MS", "not-a-number"),
            ("FEEDSIFT_METRICS_ENABLED", "true"),
        ]);
        let config = FeedsiftConfig::default()
            .with_overrides_from(|k| env.get(k).map(|v| (*v).to_string()));

        assert_eq!(config.data_dir, PathBuf::from("/var/fs"));
        assert_eq!(config.media.timeout, Duration::from_millis(1200));
        assert_eq!(config.scan.debounce, Duration::from_millis(50));
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_load_from_missing_file_is_error() {
        let result = FeedsiftConfig::load_from_file(Path::new("/nonexistent/feedsift.toml"));
        assert!(result.is_err());
    }
}
