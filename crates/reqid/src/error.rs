//! Error types.

/// Configuration errors raised while building a layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid header name {name:?}: {source}")]
    InvalidHeaderName {
        name: String,
        #[source]
        source: http::header::InvalidHeaderName,
    },
}

/// Failures reported by a [`LogSink`](crate::log::LogSink).
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to write log record: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize log record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("log writer lock poisoned")]
    Poisoned,
}
