//! Tower middleware that negotiates a request id for every request.
//!
//! The negotiated id is:
//! - stored in a [`Context`] placed in the request extensions (read it back with
//!   [`load`](crate::load) or [`from_context`](crate::from_context)),
//! - echoed on the response under the negotiated header name,
//! - written into the request headers when it was generated, so nested layers and
//!   header-reading extractors see the same id.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use http::header::{HeaderName, HeaderValue};
use http::{Request, Response};
use tower::{Layer, Service};

use crate::context::Context;
use crate::generator::Generator;
use crate::negotiate::{negotiate, HeaderList};
use crate::request_id::{store, RequestId};

// ---------------------------------------------------------------------------
// RequestIdLayer
// ---------------------------------------------------------------------------

/// Tower layer that wraps services with request id negotiation.
///
/// Checks [`HeaderList::default`] unless configured with [`with_headers`](Self::with_headers).
pub struct RequestIdLayer<G: ?Sized> {
    generator: Arc<G>,
    headers: HeaderList,
}

impl<G> RequestIdLayer<G> {
    pub fn new(generator: G) -> Self {
        Self::from_shared(Arc::new(generator))
    }
}

impl<G: ?Sized> RequestIdLayer<G> {
    /// Build from a generator that is already shared, e.g. `Arc<dyn Generator>`.
    pub fn from_shared(generator: Arc<G>) -> Self {
        Self {
            generator,
            headers: HeaderList::default(),
        }
    }

    /// Replace the candidate header names. The first one names generated ids.
    pub fn with_headers(mut self, headers: HeaderList) -> Self {
        self.headers = headers;
        self
    }

    pub fn headers(&self) -> &HeaderList {
        &self.headers
    }
}

impl<G: ?Sized> Clone for RequestIdLayer<G> {
    fn clone(&self) -> Self {
        Self {
            generator: self.generator.clone(),
            headers: self.headers.clone(),
        }
    }
}

impl<S, G: ?Sized> Layer<S> for RequestIdLayer<G> {
    type Service = RequestIdService<S, G>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService {
            inner,
            generator: self.generator.clone(),
            headers: self.headers.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// RequestIdService
// ---------------------------------------------------------------------------

/// Service wrapper produced by [`RequestIdLayer`].
pub struct RequestIdService<S, G: ?Sized> {
    inner: S,
    generator: Arc<G>,
    headers: HeaderList,
}

impl<S: Clone, G: ?Sized> Clone for RequestIdService<S, G> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            generator: self.generator.clone(),
            headers: self.headers.clone(),
        }
    }
}

impl<S, G, ReqBody, ResBody> Service<Request<ReqBody>> for RequestIdService<S, G>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: 'static,
    ResBody: 'static,
    G: Generator + ?Sized,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<ResBody>, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let parent = req.extensions().get::<Context>().cloned().unwrap_or_default();

        let (name, value, id) = match negotiate(self.headers.as_slice(), req.headers()) {
            Some((name, value)) => {
                // Echoed verbatim; the context gets a lossy string view of the bytes.
                let id = RequestId::from(String::from_utf8_lossy(value.as_bytes()).into_owned());
                tracing::trace!(header = %name, request_id = %id, "Adopted inbound request id");
                (name.clone(), Some(value.clone()), id)
            }
            None => {
                let name = self.headers.primary().clone();
                let id = RequestId::from(self.generator.generate(&parent));
                let value = generated_header(&name, &id);
                if let Some(ref value) = value {
                    req.headers_mut().insert(name.clone(), value.clone());
                }
                tracing::trace!(header = %name, request_id = %id, "Generated request id");
                (name, value, id)
            }
        };

        req.extensions_mut().insert(store(&parent, id));

        let fut = self.inner.call(req);
        Box::pin(async move {
            let mut response = fut.await?;
            if let Some(value) = value {
                // A header set by the downstream handler takes precedence.
                response.headers_mut().entry(name).or_insert(value);
            }
            Ok(response)
        })
    }
}

fn generated_header(name: &HeaderName, id: &RequestId) -> Option<HeaderValue> {
    match HeaderValue::from_str(id) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(
                error = %e,
                header = %name,
                request_id = %id,
                "Generated request id is not a valid header value, skipping response header"
            );
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
