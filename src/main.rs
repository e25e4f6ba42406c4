//! Flashcard Server
//!
//! AI-powered language learning flashcard generator with sentence-feedback
//! chat, backed by Gemini for generation and tesseract for OCR.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flashcard_server::chat::REAP_INTERVAL;
use flashcard_server::config::Config;
use flashcard_server::extract::{TesseractExtractor, TextExtractor};
use flashcard_server::gemini::GeminiClient;
use flashcard_server::routes;
use flashcard_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flashcard_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration; the generation API key is mandatory.
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("configuration error")?;

    tracing::info!("Starting Flashcard Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Generation model: {}", config.gemini.model);

    let backend = Arc::new(
        GeminiClient::new(&config.gemini).context("failed to initialize Gemini client")?,
    );

    let extractor = Arc::new(TesseractExtractor::default());
    if !extractor.is_available().await {
        tracing::warn!("tesseract not found on PATH; image card creation will fail");
    }

    let addr = SocketAddr::new(
        config
            .server
            .host
            .parse()
            .context("invalid SERVER_HOST address")?,
        config.server.port,
    );

    // Create application state
    let state = AppState::new(config, backend, extractor);

    // Background reaper for idle chat sessions
    let _reaper = state.sessions().clone().spawn_reaper(REAP_INTERVAL);

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = routes::router()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    // Start server with graceful shutdown
    tracing::info!("Flashcard Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind server address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
