//! Command-line and environment configuration
//!
//! Every flag has an environment fallback so the service can run under a
//! process supervisor without a wrapper script.

use std::path::PathBuf;

use axum::http::HeaderValue;
use clap::Parser;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::services::analysis_client::{DEFAULT_MODEL, DEFAULT_OLLAMA_URL};

/// Command-line arguments for revlens
#[derive(Parser, Debug)]
#[command(name = "revlens")]
#[command(about = "Customer review ingestion and insight service")]
#[command(version)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8000", env = "REVLENS_PORT")]
    pub port: u16,

    /// SQLite database file
    #[arg(short, long, default_value = "revlens.db", env = "REVLENS_DB")]
    pub database: PathBuf,

    /// Base URL of the Ollama-compatible analysis backend
    #[arg(long, default_value = DEFAULT_OLLAMA_URL, env = "REVLENS_OLLAMA_URL")]
    pub ollama_url: String,

    /// Model name sent with every analysis request
    #[arg(long, default_value = DEFAULT_MODEL, env = "REVLENS_OLLAMA_MODEL")]
    pub ollama_model: String,

    /// Comma-separated CORS origin allowlist; unset or "*" allows any origin
    #[arg(long, env = "REVLENS_ALLOWED_ORIGINS")]
    pub allowed_origins: Option<String>,
}

/// Build the CORS layer from the configured origin list
///
/// Entries that fail to parse as header values are skipped with a warning;
/// an allowlist with no usable entries falls back to allowing any origin
/// rather than locking every browser client out.
pub fn cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    let Some(raw) = allowed_origins else {
        return CorsLayer::permissive();
    };

    let origins = split_origins(raw);
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let mut values = Vec::new();
    for origin in &origins {
        match origin.parse::<HeaderValue>() {
            Ok(value) => values.push(value),
            Err(_) => warn!(origin = %origin, "ignoring unparseable CORS origin"),
        }
    }

    if values.is_empty() {
        warn!("no usable CORS origins configured, allowing any origin");
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(values))
        .allow_methods(Any)
        .allow_headers(Any)
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
