//! revlens - Customer review ingestion and insight service
//!
//! Accepts review batch uploads, analyzes each row against an
//! Ollama-compatible backend, and serves aggregated insight endpoints
//! over HTTP REST + SSE.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use revlens::config::{self, Args};
use revlens::services::analysis_client::AnalysisClient;
use revlens::{build_router, db, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "revlens=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments
    let args = Args::parse();

    info!("Starting revlens v{}", env!("CARGO_PKG_VERSION"));
    info!("Database: {}", args.database.display());
    info!(
        "Analysis backend: {} (model {})",
        args.ollama_url, args.ollama_model
    );

    // Open or create the database
    let db_pool = db::connect(&args.database)
        .await
        .context("Failed to open database")?;
    info!("Database connection established");

    // Analysis backend client
    let analysis = Arc::new(
        AnalysisClient::new(&args.ollama_url, &args.ollama_model)
            .context("Failed to build analysis client")?,
    );

    // Application state plus the background ingestion worker
    let (state, runner, cancel) = AppState::assemble(db_pool, analysis);

    // Build the application router
    let app = build_router(state).layer(config::cors_layer(args.allowed_origins.as_deref()));

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // The router (and the job sender inside it) is gone once serve returns.
    // Cancelling lets an in-flight batch stop at its next row boundary.
    cancel.cancel();
    runner.join().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
