//! Structured log records, sinks, and the request id sink decorator.
//!
//! A [`LogSink`] receives every record together with the [`Context`] it was emitted
//! under. [`RequestIdSink`] wraps another sink and adds the context's request id to
//! each record before delegating, so handler code never threads the id by hand:
//!
//! ```
//! use reqid::{store, Context, JsonSink, Logger, RequestIdSink};
//!
//! let logger = Logger::new(RequestIdSink::new(JsonSink::new(Vec::<u8>::new())));
//! let cx = store(&Context::background(), "abc123");
//! logger.info(&cx, "ping requested"); // {"level":"INFO","msg":"ping requested","request_id":"abc123",...}
//! ```

use std::borrow::Cow;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Map, Value};
use tracing::level_filters::LevelFilter;
use tracing::Level;

use crate::context::Context;
use crate::error::SinkError;
use crate::request_id::load;

/// Field name used by [`RequestIdSink::new`].
pub const DEFAULT_FIELD: &str = "request_id";

/// One structured log event.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub time: SystemTime,
    pub level: Level,
    pub message: String,
    /// Fields in insertion order. Duplicate names are kept; the last one wins when
    /// rendered as a JSON object.
    pub fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            time: SystemTime::now(),
            level,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add_field(name, value);
        self
    }

    pub fn add_field(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.push((name.into(), value.into()));
    }

    /// The last value recorded under `name`.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .rev()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    fn fields_object(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for (name, value) in &self.fields {
            map.insert(name.clone(), value.clone());
        }
        map
    }
}

/// Destination for structured records. Implementations must tolerate concurrent
/// calls from many requests.
pub trait LogSink: Send + Sync {
    /// Whether records at `level` would be kept. Checked by [`Logger`] before a
    /// record is built.
    fn enabled(&self, level: Level) -> bool {
        let _ = level;
        true
    }

    fn handle(&self, cx: &Context, record: Record) -> Result<(), SinkError>;
}

impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn enabled(&self, level: Level) -> bool {
        (**self).enabled(level)
    }

    fn handle(&self, cx: &Context, record: Record) -> Result<(), SinkError> {
        (**self).handle(cx, record)
    }
}

impl<S: LogSink + ?Sized> LogSink for Box<S> {
    fn enabled(&self, level: Level) -> bool {
        (**self).enabled(level)
    }

    fn handle(&self, cx: &Context, record: Record) -> Result<(), SinkError> {
        (**self).handle(cx, record)
    }
}

// ---------------------------------------------------------------------------
// RequestIdSink
// ---------------------------------------------------------------------------

/// Adds the context's request id to each record, then delegates to `inner`.
///
/// Records emitted under a context without a request id pass through untouched.
#[derive(Debug, Clone)]
pub struct RequestIdSink<S> {
    inner: S,
    key: Cow<'static, str>,
}

impl<S> RequestIdSink<S> {
    /// Decorate `inner`, recording the id under [`DEFAULT_FIELD`].
    pub fn new(inner: S) -> Self {
        Self::with_key(inner, DEFAULT_FIELD)
    }

    pub fn with_key(inner: S, key: impl Into<Cow<'static, str>>) -> Self {
        Self {
            inner,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: LogSink> LogSink for RequestIdSink<S> {
    fn enabled(&self, level: Level) -> bool {
        self.inner.enabled(level)
    }

    fn handle(&self, cx: &Context, mut record: Record) -> Result<(), SinkError> {
        if let Some(id) = load(cx).filter(|id| !id.is_empty()) {
            record.add_field(self.key.as_ref(), id.as_str());
        }
        self.inner.handle(cx, record)
    }
}

// ---------------------------------------------------------------------------
// JsonSink
// ---------------------------------------------------------------------------

/// Writes one JSON object per record, newline-terminated.
///
/// Keys: `time` (unix milliseconds), `level`, `msg`, then the record's fields.
#[derive(Debug)]
pub struct JsonSink<W> {
    writer: Mutex<W>,
    max_level: LevelFilter,
}

impl<W: Write + Send> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            max_level: LevelFilter::TRACE,
        }
    }

    /// Drop records more verbose than `max_level`.
    pub fn with_max_level(mut self, max_level: LevelFilter) -> Self {
        self.max_level = max_level;
        self
    }

    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer.into_inner().map_err(|_| SinkError::Poisoned)
    }
}

impl<W: Write + Send> LogSink for JsonSink<W> {
    fn enabled(&self, level: Level) -> bool {
        level <= self.max_level
    }

    fn handle(&self, _cx: &Context, record: Record) -> Result<(), SinkError> {
        let millis = record
            .time
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        let mut line = Map::new();
        line.insert("time".to_string(), Value::from(millis));
        line.insert("level".to_string(), Value::from(record.level.as_str()));
        line.insert("msg".to_string(), Value::from(record.message.clone()));
        line.extend(record.fields_object());

        let mut writer = self.writer.lock().map_err(|_| SinkError::Poisoned)?;
        serde_json::to_writer(&mut *writer, &Value::Object(line))?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TracingSink
// ---------------------------------------------------------------------------

/// Forwards records into the `tracing` subscriber as events with target `reqid::log`.
///
/// Record fields are rendered as one JSON object in the `fields` event field, since
/// tracing field names must be known at compile time. Under a JSON subscriber the
/// request id therefore appears inside that escaped string, not as its own key; use
/// [`JsonSink`] when downstream tooling needs `request_id` as a top-level field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn enabled(&self, level: Level) -> bool {
        level <= LevelFilter::current()
    }

    fn handle(&self, _cx: &Context, record: Record) -> Result<(), SinkError> {
        let fields = Value::Object(record.fields_object()).to_string();
        let message = record.message;
        match record.level {
            Level::ERROR => tracing::error!(target: "reqid::log", fields = %fields, "{message}"),
            Level::WARN => tracing::warn!(target: "reqid::log", fields = %fields, "{message}"),
            Level::INFO => tracing::info!(target: "reqid::log", fields = %fields, "{message}"),
            Level::DEBUG => tracing::debug!(target: "reqid::log", fields = %fields, "{message}"),
            _ => tracing::trace!(target: "reqid::log", fields = %fields, "{message}"),
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Logger
// ---------------------------------------------------------------------------

/// Convenience front end over a sink. Cheap to clone when `S` is.
///
/// Sink failures are reported as `tracing` warnings and never surface to the caller.
#[derive(Debug, Clone)]
pub struct Logger<S> {
    sink: S,
}

impl<S: LogSink> Logger<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn log(&self, cx: &Context, record: Record) {
        if !self.sink.enabled(record.level) {
            return;
        }
        if let Err(e) = self.sink.handle(cx, record) {
            tracing::warn!(error = %e, "Failed to emit log record");
        }
    }

    pub fn error(&self, cx: &Context, message: impl Into<String>) {
        self.emit(cx, Level::ERROR, message);
    }

    pub fn warn(&self, cx: &Context, message: impl Into<String>) {
        self.emit(cx, Level::WARN, message);
    }

    pub fn info(&self, cx: &Context, message: impl Into<String>) {
        self.emit(cx, Level::INFO, message);
    }

    pub fn debug(&self, cx: &Context, message: impl Into<String>) {
        self.emit(cx, Level::DEBUG, message);
    }

    pub fn trace(&self, cx: &Context, message: impl Into<String>) {
        self.emit(cx, Level::TRACE, message);
    }

    fn emit(&self, cx: &Context, level: Level, message: impl Into<String>) {
        if self.sink.enabled(level) {
            self.log(cx, Record::new(level, message));
        }
    }
}
