//! Tag Stream Server Binary
//!
//! Serves the ExifTool tag dictionary as streamed JSON.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin tag-stream-server
//! curl 'http://localhost:8080/tags?table=EXIF&tag=Make'
//! ```
//!
//! # Environment Variables
//!
//! - `TAGS_SERVER_HOST`: Listen address (default: 0.0.0.0)
//! - `TAGS_SERVER_PORT`: Listen port (default: 8080)
//! - `EXIFTOOL_PATH`: Program to run (default: exiftool)
//! - `EXIFTOOL_ARGS`: Whitespace-separated arguments (default: -listx)
//! - `TAGS_REQUIRE_TABLE`: Reject `/tags` without `table` (default: false)
//! - `TAGS_STREAM_BUFFER`: Body chunks buffered per request (default: 32)
//! - `OTEL_ENABLED`: Export spans over OTLP (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: tag-stream-server)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tag_stream_server::{
    AppState, ExiftoolSource, ServerConfig, TagStreamService, create_router, init_metrics,
    init_telemetry,
};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Time allowed for open connections to drain after a shutdown signal.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let _telemetry_guard = init_telemetry().context("failed to initialize telemetry")?;

    tracing::info!("Starting Tag Stream Server");

    let _metrics_handle = init_metrics();

    let config = ServerConfig::from_env().context("invalid configuration")?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    let source = Arc::new(ExiftoolSource::new(config.command.clone()));
    let service = TagStreamService::new(source);
    let state = Arc::new(AppState::new(
        service,
        config.stream.clone(),
        shutdown_token.clone(),
    ));
    let router = create_router(state);

    let addr = config.server.addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(addr = %addr, "HTTP server listening");

    let server_shutdown = shutdown_token.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
            .await
    });

    tokio::select! {
        result = &mut server => {
            result.context("HTTP server task panicked")??;
            tracing::warn!("HTTP server exited without a shutdown signal");
            return Ok(());
        }
        () = await_shutdown(shutdown_token) => {}
    }

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, server).await {
        Ok(result) => result.context("HTTP server task panicked")??,
        Err(_) => tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Graceful shutdown timed out"
        ),
    }

    tracing::info!("Tag stream server stopped");
    Ok(())
}

/// Log the parsed configuration.
fn log_config(config: &ServerConfig) {
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        command = %config.command.display(),
        require_table = config.stream.require_table,
        buffer_capacity = config.stream.buffer_capacity,
        "Configuration loaded"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT), then cancel running streams.
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
