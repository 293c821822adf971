//! Axum HTTP server: router, listener, graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Router};
use reqid::{Context, Generator, LogSink, Logger, Record, RequestIdLayer, RequestIdSink};
use tower_http::trace::TraceLayer;
use tracing::Span;

/// Logger whose records are annotated with the active request id.
pub type AppLogger = Logger<RequestIdSink<Arc<dyn LogSink>>>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub listen_address: String,
    pub logger: AppLogger,
}

/// Build the router. `request_ids` wraps everything, so the request span and every
/// handler already see the negotiated id.
pub fn router(state: AppState, request_ids: RequestIdLayer<dyn Generator>) -> Router {
    Router::new()
        .route("/ping", get(handle_ping))
        .route("/health", get(handle_health))
        .with_state(Arc::new(state))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(make_request_span)
                .on_response(record_response),
        )
        .layer(request_ids)
}

/// Build and run the HTTP server.
pub async fn run(state: AppState, request_ids: RequestIdLayer<dyn Generator>) -> anyhow::Result<()> {
    let listen_addr = state.listen_address.clone();
    let app = router(state, request_ids);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "reqid-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("reqid-server shut down gracefully");
    Ok(())
}

fn make_request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .extensions()
        .get::<Context>()
        .map(reqid::from_context)
        .unwrap_or_default();
    reqid_tracing::request_span!(request_id, request.method(), request.uri().path())
}

fn record_response(response: &Response<Body>, latency: Duration, span: &Span) {
    span.record("status", response.status().as_u16());
    span.record("latency_ms", latency.as_millis() as u64);
    tracing::debug!("Response sent");
}

/// GET /ping: logs through the request-id-aware logger and reports the id.
async fn handle_ping(
    State(state): State<Arc<AppState>>,
    Extension(cx): Extension<Context>,
) -> Response {
    // The logger picks the request id up from the context; no need to add it here.
    state.logger.info(&cx, "ping requested");

    let request_id = reqid::from_context(&cx);
    (StatusCode::OK, format!("PONG! request id {request_id:?}")).into_response()
}

/// Health check endpoint.
async fn handle_health(
    State(state): State<Arc<AppState>>,
    Extension(cx): Extension<Context>,
) -> impl IntoResponse {
    state
        .logger
        .log(&cx, Record::new(tracing::Level::DEBUG, "health checked").with_field("route", "/health"));
    (StatusCode::OK, "ok")
}

/// Wait for SIGINT (Ctrl+C) for graceful shutdown.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C signal handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
