//! Tracing configuration types.

use serde::Deserialize;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Configuration for the tracing subsystem.
#[derive(Debug, Clone, Deserialize)]
pub struct TracingConfig {
    /// The service name reported to the OTLP collector.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// OTLP collector endpoint (e.g. "http://localhost:4317").
    /// When `None`, OTLP export is disabled and only fmt logging is used.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    /// Transport protocol for OTLP export.
    #[serde(default)]
    pub protocol: OtlpProtocol,

    /// Log level filter (e.g. "info", "debug", "reqid=trace,info").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Output format of the stderr log layer.
    #[serde(default)]
    pub format: LogFormat,
}

/// OTLP transport protocol.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OtlpProtocol {
    #[default]
    Grpc,
    Http,
}

/// Stderr log line format.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn default_service_name() -> String {
    "reqid-server".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            otlp_endpoint: None,
            protocol: OtlpProtocol::default(),
            log_level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl TracingConfig {
    /// Most verbose level `log_level` lets through, for sinks that sit outside the
    /// subscriber. Unparseable filters fall back to `info`, matching the subscriber.
    pub fn max_level(&self) -> LevelFilter {
        EnvFilter::try_new(&self.log_level)
            .ok()
            .and_then(|filter| filter.max_level_hint())
            .unwrap_or(LevelFilter::INFO)
    }
}

#[cfg(test)]
mod tests {
    use figment::providers::{Format, Toml};
    use figment::Figment;

    use super::*;

    #[test]
    fn test_empty_table_uses_defaults() {
        let config: TracingConfig = Figment::new().merge(Toml::string("")).extract().unwrap();

        assert_eq!(config.service_name, "reqid-server");
        assert_eq!(config.otlp_endpoint, None);
        assert_eq!(config.protocol, OtlpProtocol::Grpc);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.format, LogFormat::Text);
    }

    #[test]
    fn test_overrides_parse() {
        let toml = r#"
            service_name = "edge"
            otlp_endpoint = "http://collector:4318"
            protocol = "http"
            log_level = "reqid=trace,info"
            format = "json"
        "#;
        let config: TracingConfig = Figment::new().merge(Toml::string(toml)).extract().unwrap();

        assert_eq!(config.service_name, "edge");
        assert_eq!(config.otlp_endpoint.as_deref(), Some("http://collector:4318"));
        assert_eq!(config.protocol, OtlpProtocol::Http);
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_max_level_follows_log_level() {
        let mut config = TracingConfig::default();
        assert_eq!(config.max_level(), LevelFilter::INFO);

        config.log_level = "warn".to_string();
        assert_eq!(config.max_level(), LevelFilter::WARN);

        config.log_level = "reqid=trace,info".to_string();
        assert_eq!(config.max_level(), LevelFilter::TRACE);

        config.log_level = "reqid=loudest".to_string();
        assert_eq!(config.max_level(), LevelFilter::INFO);
    }
}
