//! pollcast server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints and closes
//! every WebSocket connection on SIGINT / SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

use pollcast::api::build_app;
use pollcast::app_state::AppState;
use pollcast::config::{GatewayConfig, LogFormat};
use pollcast::ws::SubscriptionManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = GatewayConfig::from_env().context("invalid LISTEN_ADDR")?;

    // Initialize tracing
    init_tracing(config.log_format);
    tracing::info!(addr = %config.listen_addr, "starting pollcast");

    // Build application state and router
    let app_state = AppState::new(config.connection_settings());
    let subscriptions = Arc::clone(&app_state.subscriptions);
    let app = build_app(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    let drained = Arc::new(Notify::new());
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(close_on_signal(subscriptions, Arc::clone(&drained)))
        .into_future();

    let grace = config.shutdown_grace();
    tokio::select! {
        result = server => result.context("server error")?,
        () = async {
            drained.notified().await;
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!(grace_secs = grace.as_secs(), "http drain timed out");
        }
    }

    tracing::info!("server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Resolves once a shutdown signal arrives and every WebSocket connection
/// has been closed.
async fn close_on_signal(subscriptions: Arc<SubscriptionManager>, drained: Arc<Notify>) {
    wait_for_signal().await;
    tracing::info!("shutting down");
    let closed = subscriptions.shutdown().await;
    tracing::info!(closed, "websocket connections closed");
    drained.notify_one();
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
