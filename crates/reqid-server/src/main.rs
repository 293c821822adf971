//! reqid-server: example HTTP service showing request ids flowing into responses and logs.

mod config;
mod server;

use config::ServerAppConfig;
use reqid::{Logger, RequestIdLayer, RequestIdSink};
use server::AppState;

fn main() -> anyhow::Result<()> {
    // Parse CLI args
    let args: Vec<String> = std::env::args().collect();
    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1).cloned())
        .or_else(|| args.get(1).filter(|a| !a.starts_with('-')).cloned())
        .or_else(|| std::env::var("REQID_CONFIG").ok())
        .unwrap_or_else(|| "reqid-server.toml".to_string());

    let listen_override = args
        .iter()
        .position(|a| a == "--listen")
        .and_then(|i| args.get(i + 1).cloned());

    // Load configuration
    let mut config = ServerAppConfig::load(&config_path)?;

    // CLI overrides take precedence over TOML and env vars
    if let Some(address) = listen_override {
        config.server.listen_address = address;
    }

    // Build the tokio runtime first; the tonic OTLP exporter needs a reactor context
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        // OTLP export is optional and falls back to fmt-only
        let _tracing_guard = reqid_tracing::init_tracing(&config.tracing);

        tracing::info!(
            config_path = %config_path,
            listen_address = %config.server.listen_address,
            generator = ?config.request_id.generator,
            log_sink = ?config.request_id.log_sink,
            "Starting reqid-server"
        );

        run(config).await
    })
}

async fn run(config: ServerAppConfig) -> anyhow::Result<()> {
    let headers = config.request_id.header_list()?;
    tracing::info!(
        headers = ?headers.as_slice(),
        primary = %headers.primary(),
        "Request id headers configured"
    );

    let request_ids =
        RequestIdLayer::from_shared(config.request_id.build_generator()).with_headers(headers);

    let sink = config.build_log_sink();
    let logger = Logger::new(RequestIdSink::with_key(sink, config.request_id.log_key.clone()));

    let state = AppState {
        listen_address: config.server.listen_address.clone(),
        logger,
    };

    server::run(state, request_ids).await
}
