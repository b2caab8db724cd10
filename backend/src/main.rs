//! Vocal Separator Backend
//!
//! An HTTP server that splits uploaded tracks into vocals and accompaniment
//! with an external separation tool and serves the results.

use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;
use tracing::info;
use vocal_separator_backend::{
    api, config::Config, services::staging::StagingService, state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env();
    info!("Configuration loaded: {:?}", config);

    StagingService::ensure_directories(&config.storage)
        .await
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to create working directories under {}: {}",
                config.storage.base_dir.display(),
                e
            )
        })?;

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;

    let shutdown = CancellationToken::new();
    let app = api::router(AppState::new(config, shutdown.clone()));

    info!("🚀 Server running on http://{}", addr);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // Setup graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Handle graceful shutdown signals (Ctrl+C, SIGTERM)
///
/// Running separation jobs are cancelled so in-flight requests finish promptly.
async fn shutdown_signal(jobs: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }

    jobs.cancel();
}
