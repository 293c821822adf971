//! Tracing setup for reqid services: fmt/JSON logging, optional OTLP export, and
//! request spans that carry the request id.

pub mod config;
pub mod otlp;
pub mod spans;

pub use config::{LogFormat, OtlpProtocol, TracingConfig};
pub use otlp::{init_tracing, TracingGuard};
