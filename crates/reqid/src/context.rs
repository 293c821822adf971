//! Immutable, request-scoped key/value context.
//!
//! Keys are Rust types: a value can only be read back by code that can name the key
//! type, so a private key type cannot be forged or overwritten from outside its module.
//! Deriving a context pushes a node in front of the chain; ancestors are never touched,
//! and lookups return the most recent association for a key.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

struct Node {
    parent: Option<Arc<Node>>,
    key: TypeId,
    value: Arc<dyn Any + Send + Sync>,
}

/// Request-scoped context. Cheap to clone (Arc).
#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Node>>,
    cancel: Option<CancellationToken>,
}

impl Context {
    /// The empty root context. Carries no values and is never cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a child context associating key type `K` with `value`.
    ///
    /// `self` is left unchanged; the child shadows any earlier value stored under `K`.
    pub fn with_value<K, V>(&self, value: V) -> Self
    where
        K: 'static,
        V: Send + Sync + 'static,
    {
        Self {
            head: Some(Arc::new(Node {
                parent: self.head.clone(),
                key: TypeId::of::<K>(),
                value: Arc::new(value),
            })),
            cancel: self.cancel.clone(),
        }
    }

    /// Look up the most recent value stored under key type `K`.
    ///
    /// Returns `None` when the key is absent, or when the nearest association holds a
    /// value of a different type than `V`.
    pub fn value<K, V>(&self) -> Option<&V>
    where
        K: 'static,
        V: 'static,
    {
        let key = TypeId::of::<K>();
        let mut node = self.head.as_deref();
        while let Some(current) = node {
            if current.key == key {
                return current.value.downcast_ref::<V>();
            }
            node = current.parent.as_deref();
        }
        None
    }

    /// Derive a cancellable child context.
    ///
    /// The returned token is a child of any token already on `self`: cancelling the
    /// parent cancels the child, never the other way round.
    pub fn with_cancel(&self) -> (Self, CancellationToken) {
        let token = match &self.cancel {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
        let cx = Self {
            head: self.head.clone(),
            cancel: Some(token.clone()),
        };
        (cx, token)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Resolves once the context is cancelled. Pends forever on a context that has
    /// no cancellation signal attached.
    pub async fn cancelled(&self) {
        match &self.cancel {
            Some(token) => token.cancelled().await,
            None => std::future::pending().await,
        }
    }

    fn depth(&self) -> usize {
        let mut depth = 0;
        let mut node = self.head.as_deref();
        while let Some(current) = node {
            depth += 1;
            node = current.parent.as_deref();
        }
        depth
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("values", &self.depth())
            .field("cancellable", &self.cancel.is_some())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
