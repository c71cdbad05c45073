//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Default filter directive.
const DEFAULT_FILTER: &str = "feedsift=info";
/// Filter directive for verbose or debug-mode runs.
const VERBOSE_FILTER: &str = "feedsift=debug";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name. Anything but `json` is pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Optional append-only log file; stderr otherwise.
    pub file: Option<PathBuf>,
    /// `EnvFilter` directive.
    pub filter: String,
}

impl LoggingConfig {
    /// Builds logging configuration from config settings.
    ///
    /// `RUST_LOG` overrides the filter when set.
    #[must_use]
    pub fn from_settings(settings: &LoggingSettings, verbose: bool) -> Self {
        Self::with_env_filter(settings, verbose, std::env::var("RUST_LOG").ok())
    }

    fn with_env_filter(
        settings: &LoggingSettings,
        verbose: bool,
        rust_log: Option<String>,
    ) -> Self {
        let filter = rust_log
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| {
                let directive = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
                directive.to_string()
            });
        Self {
            format: settings.format,
            file: settings.file.clone(),
            filter,
        }
    }

    /// Builds the `EnvFilter`, falling back to the default on a bad directive.
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("other"), LogFormat::Pretty);
    }

    #[test]
    fn test_filter_selection() {
        let settings = LoggingSettings::default();
        assert_eq!(
            LoggingConfig::with_env_filter(&settings, false, None).filter,
            "feedsift=info"
        );
        assert_eq!(
            LoggingConfig::with_env_filter(&settings, true, None).filter,
            "feedsift=debug"
        );
        assert_eq!(
            LoggingConfig::with_env_filter(&settings, true, Some("warn".to_string())).filter,
            "warn"
        );
    }
}
