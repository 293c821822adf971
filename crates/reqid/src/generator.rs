//! Request id generation.
//!
//! Generators are infallible at the type level. One that cannot produce an id (for
//! example because its entropy source failed) panics, which aborts only the request
//! task that asked for it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::RngCore;
use uuid::Uuid;

use crate::context::Context;

/// Produces a new opaque request id for each call.
///
/// `cx` is the inbound request context; generators that may block should observe
/// [`Context::is_cancelled`].
pub trait Generator: Send + Sync {
    fn generate(&self, cx: &Context) -> String;
}

/// Adapts a plain function or closure into a [`Generator`].
#[derive(Clone)]
pub struct GeneratorFn<F>(pub F);

impl<F> Generator for GeneratorFn<F>
where
    F: Fn(&Context) -> String + Send + Sync,
{
    fn generate(&self, cx: &Context) -> String {
        (self.0)(cx)
    }
}

impl<F> fmt::Debug for GeneratorFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GeneratorFn")
    }
}

impl<G: Generator + ?Sized> Generator for std::sync::Arc<G> {
    fn generate(&self, cx: &Context) -> String {
        (**self).generate(cx)
    }
}

impl<G: Generator + ?Sized> Generator for Box<G> {
    fn generate(&self, cx: &Context) -> String {
        (**self).generate(cx)
    }
}

/// UUID v4 ids, e.g. `67e55044-10b1-426f-9247-bb680e5fe0c8`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl Generator for UuidGenerator {
    fn generate(&self, _cx: &Context) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Hex-encoded random bytes from the thread-local CSPRNG.
#[derive(Debug, Clone, Copy)]
pub struct RandomHexGenerator {
    bytes: usize,
}

impl RandomHexGenerator {
    pub const DEFAULT_BYTES: usize = 16;

    /// `bytes` random bytes per id (the id is twice as many hex characters).
    /// Zero is bumped to one so ids are never empty.
    pub fn new(bytes: usize) -> Self {
        Self {
            bytes: bytes.max(1),
        }
    }
}

impl Default for RandomHexGenerator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BYTES)
    }
}

impl Generator for RandomHexGenerator {
    fn generate(&self, _cx: &Context) -> String {
        let mut buf = vec![0u8; self.bytes];
        rand::thread_rng().fill_bytes(&mut buf);
        hex::encode(buf)
    }
}

/// Monotonic `<prefix>-<n>` ids, counting from 1 per generator instance.
#[derive(Debug)]
pub struct SequenceGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequenceGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        Self::new("req")
    }
}

impl Generator for SequenceGenerator {
    fn generate(&self, _cx: &Context) -> String {
        // Relaxed: uniqueness only needs the atomic increment itself.
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{n}", self.prefix)
    }
}
