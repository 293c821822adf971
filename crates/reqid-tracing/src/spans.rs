//! Span builder helpers for request instrumentation.

/// Create the top-level span for one HTTP request.
///
/// Usage: `let span = request_span!(request_id, method, path);`
///
/// Every event recorded inside the span carries `request_id`, so plain `tracing`
/// calls in handlers are correlated without passing the id around.
///
/// Fields recorded later by the response hook:
/// - `status`: HTTP status code of the response
/// - `latency_ms`: milliseconds from request start to response headers
#[macro_export]
macro_rules! request_span {
    ($request_id:expr, $method:expr, $path:expr) => {
        tracing::info_span!(
            "http_request",
            request_id = %$request_id,
            method = %$method,
            path = %$path,
            status = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
        )
    };
}
