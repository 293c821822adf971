//! Configuration types and loading logic.

use std::io;
use std::sync::Arc;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use reqid::{
    Generator, HeaderList, JsonSink, LogSink, RandomHexGenerator, SequenceGenerator,
    TracingSink, UuidGenerator,
};
use reqid_tracing::TracingConfig;
use serde::Deserialize;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerAppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub request_id: RequestIdConfig,
    #[serde(default)]
    pub tracing: TracingConfig,
}

/// Server listen configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
}

/// Request id negotiation and logging.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestIdConfig {
    /// Candidate inbound headers, highest priority first. Empty means the built-in
    /// default list.
    #[serde(default)]
    pub headers: Vec<String>,

    /// Log record field that receives the request id.
    #[serde(default = "default_log_key")]
    pub log_key: String,

    #[serde(default)]
    pub generator: GeneratorKind,

    /// Random bytes per id for the `hex` generator.
    #[serde(default = "default_hex_bytes")]
    pub hex_bytes: usize,

    /// Prefix for the `sequence` generator.
    #[serde(default = "default_sequence_prefix")]
    pub sequence_prefix: String,

    #[serde(default)]
    pub log_sink: SinkKind,
}

/// Which generator produces ids for requests that arrive without one.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    #[default]
    Hex,
    Uuid,
    Sequence,
}

/// Where application log records go.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Into the tracing subscriber, alongside framework events. Record fields,
    /// including the request id, travel as one JSON string in the event's `fields`
    /// value; pick `json` to get `request_id` as a top-level key.
    #[default]
    Tracing,
    /// JSON lines on stderr, filtered to `tracing.log_level`.
    Json,
}

fn default_listen_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_key() -> String {
    reqid::DEFAULT_FIELD.to_string()
}

fn default_hex_bytes() -> usize {
    RandomHexGenerator::DEFAULT_BYTES
}

fn default_sequence_prefix() -> String {
    "req".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
        }
    }
}

impl Default for RequestIdConfig {
    fn default() -> Self {
        Self {
            headers: Vec::new(),
            log_key: default_log_key(),
            generator: GeneratorKind::default(),
            hex_bytes: default_hex_bytes(),
            sequence_prefix: default_sequence_prefix(),
            log_sink: SinkKind::default(),
        }
    }
}

impl RequestIdConfig {
    pub fn header_list(&self) -> Result<HeaderList, reqid::Error> {
        HeaderList::new(&self.headers)
    }

    pub fn build_generator(&self) -> Arc<dyn Generator> {
        match self.generator {
            GeneratorKind::Hex => Arc::new(RandomHexGenerator::new(self.hex_bytes)),
            GeneratorKind::Uuid => Arc::new(UuidGenerator),
            GeneratorKind::Sequence => Arc::new(SequenceGenerator::new(self.sequence_prefix.clone())),
        }
    }
}

impl ServerAppConfig {
    /// Sink for application log records, as selected by `request_id.log_sink`.
    pub fn build_log_sink(&self) -> Arc<dyn LogSink> {
        match self.request_id.log_sink {
            SinkKind::Tracing => Arc::new(TracingSink),
            SinkKind::Json => {
                Arc::new(JsonSink::new(io::stderr()).with_max_level(self.tracing.max_level()))
            }
        }
    }

    /// Load configuration from TOML file and environment variables.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (REQID_ prefix, __ for nesting)
    /// 2. TOML config file (missing file is fine)
    /// 3. Defaults
    pub fn load(config_path: &str) -> anyhow::Result<Self> {
        let config: ServerAppConfig = Figment::new()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("REQID_").split("__"))
            .extract()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::*;

    fn from_toml(toml: &str) -> ServerAppConfig {
        Figment::new().merge(Toml::string(toml)).extract().unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = from_toml("");

        assert_eq!(config.server.listen_address, "0.0.0.0:8080");
        assert!(config.request_id.headers.is_empty());
        assert_eq!(config.request_id.log_key, "request_id");
        assert_eq!(config.request_id.generator, GeneratorKind::Hex);
        assert_eq!(config.request_id.hex_bytes, 16);
        assert_eq!(config.request_id.log_sink, SinkKind::Tracing);
        assert_eq!(config.request_id.header_list().unwrap(), HeaderList::default());
    }

    #[test]
    fn test_request_id_section() {
        let config = from_toml(
            r#"
            [server]
            listen_address = "127.0.0.1:9000"

            [request_id]
            headers = ["X-Amzn-Trace-Id", "X-Request-ID"]
            log_key = "rid"
            generator = "sequence"
            sequence_prefix = "edge"
            log_sink = "json"
            "#,
        );

        assert_eq!(config.server.listen_address, "127.0.0.1:9000");
        let list = config.request_id.header_list().unwrap();
        assert_eq!(list.primary().as_str(), "x-amzn-trace-id");
        assert_eq!(list.as_slice().len(), 2);
        assert_eq!(config.request_id.log_key, "rid");
        assert_eq!(config.request_id.log_sink, SinkKind::Json);

        let generator = config.request_id.build_generator();
        assert_eq!(generator.generate(&reqid::Context::background()), "edge-1");
    }

    #[test]
    fn test_invalid_header_rejected() {
        let config = from_toml(
            r#"
            [request_id]
            headers = ["not a header"]
            "#,
        );
        assert!(config.request_id.header_list().is_err());
    }

    #[test]
    fn test_hex_generator_width() {
        let config = from_toml(
            r#"
            [request_id]
            generator = "hex"
            hex_bytes = 4
            "#,
        );
        let id = config.request_id.build_generator().generate(&reqid::Context::background());
        assert_eq!(id.len(), 8);
    }

    #[test]
    fn test_json_sink_honors_log_level() {
        let config = from_toml(
            r#"
            [request_id]
            log_sink = "json"

            [tracing]
            log_level = "info"
            "#,
        );
        let sink = config.build_log_sink();

        assert!(sink.enabled(Level::INFO));
        assert!(!sink.enabled(Level::DEBUG));
    }

    #[test]
    fn test_json_sink_debug_level() {
        let config = from_toml(
            r#"
            [request_id]
            log_sink = "json"

            [tracing]
            log_level = "debug"
            "#,
        );

        assert!(config.build_log_sink().enabled(Level::DEBUG));
        assert!(!config.build_log_sink().enabled(Level::TRACE));
    }
}
