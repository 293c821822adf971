//! Request id propagation for tower/axum services and structured logs.
//!
//! - [`RequestIdLayer`] adopts an inbound id from the first configured header that has
//!   one (or generates a new one), echoes it on the response, and stores it in a
//!   [`Context`] in the request extensions.
//! - [`RequestIdSink`] reads the id back from the [`Context`] passed with each log
//!   record and adds it as a `request_id` field.

pub mod context;
pub mod error;
pub mod generator;
pub mod layer;
pub mod log;
pub mod negotiate;
pub mod request_id;

pub use context::Context;
pub use error::{Error, SinkError};
pub use generator::{Generator, GeneratorFn, RandomHexGenerator, SequenceGenerator, UuidGenerator};
pub use layer::{RequestIdLayer, RequestIdService};
pub use log::{JsonSink, LogSink, Logger, Record, RequestIdSink, TracingSink, DEFAULT_FIELD};
pub use negotiate::{negotiate, HeaderList, DEFAULT_HEADERS};
pub use request_id::{from_context, load, store, RequestId};
