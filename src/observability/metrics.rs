//! Prometheus metrics.

use crate::config::MetricsSettings;
use crate::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are recorded.
    pub enabled: bool,
    /// Address of the HTTP listener.
    pub listen_addr: SocketAddr,
    /// Whether to expose an HTTP scrape endpoint.
    pub expose: bool,
}

impl MetricsConfig {
    /// Builds metrics configuration from config settings.
    #[must_use]
    pub const fn from_settings(settings: &MetricsSettings, expose: bool) -> Self {
        Self {
            enabled: settings.enabled,
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), settings.port),
            expose,
        }
    }
}

/// Installs the Prometheus recorder, optionally with an HTTP listener.
///
/// Returns a render handle when only the recorder is installed. The listener
/// needs a running tokio runtime.
///
/// # Errors
///
/// Returns an error if a recorder is already installed or the listener cannot
/// bind.
pub fn install_prometheus(config: &MetricsConfig) -> Result<Option<PrometheusHandle>> {
    if !config.enabled {
        return Ok(None);
    }

    let builder = PrometheusBuilder::new();
    if config.expose {
        builder
            .with_http_listener(config.listen_addr)
            .install()
            .map_err(|e| Error::operation("metrics_listener_install", e))?;
        tracing::info!(addr = %config.listen_addr, "Metrics listener started");
        return Ok(None);
    }

    builder
        .install_recorder()
        .map(Some)
        .map_err(|e| Error::operation("metrics_recorder_install", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_installs_nothing() {
        let config = MetricsConfig::from_settings(&MetricsSettings::default(), true);
        assert!(install_prometheus(&config).unwrap().is_none());
    }

    #[test]
    fn test_listen_addr_uses_port() {
        let settings = MetricsSettings {
            enabled: true,
            port: 9100,
        };
        let config = MetricsConfig::from_settings(&settings, false);
        assert_eq!(config.listen_addr.port(), 9100);
    }
}
