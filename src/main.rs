mod config;
mod currency;
mod gemini;
mod links;
mod models;
mod parser;
mod photo;
mod pipeline;
mod prompt;
mod retry;
mod routes;
mod view;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::AppConfig;
use crate::gemini::GeminiClient;
use crate::pipeline::ProductAnalyzer;
use crate::routes::{app, AppState, Sessions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let key_preview: String = config.gemini.api_key.chars().take(10).collect();
    tracing::info!("Using API key: {}...", key_preview);

    let gemini = Arc::new(GeminiClient::new(&config.gemini));
    if gemini.is_demo() {
        tracing::warn!("GEMINI_API_KEY not set, serving canned demo results");
    }
    let analyzer = ProductAnalyzer::new(gemini, config.temperature);
    let sessions = Sessions::new(config.session_ttl, config.max_sessions);
    let router = app(AppState::new(analyzer, sessions), config.max_upload_bytes);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, model = %config.gemini.model, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
