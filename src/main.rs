//! Island Adventure - streaming text adventure narrated by Gemini
//!
//! A small axum service that owns the transcript and the game controller,
//! and serves a page that renders them live over SSE.

mod api;
mod config;
mod llm;
mod narrator;
mod runtime;
mod state_machine;
mod transcript;

use api::{create_router, AppState};
use config::ServerConfig;
use llm::{GeminiSessionFactory, LlmConfig};
use state_machine::GameContext;
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "island_adventure=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let server_config = ServerConfig::from_env()?;
    let llm_config = LlmConfig::from_env();

    if llm_config.api_key().is_none() {
        // Not fatal: starting a game reports it through the error banner
        tracing::warn!("No API key configured. Set API_KEY or GEMINI_API_KEY.");
    }

    let context = GameContext::new(narrator::session_config(llm_config.model.as_deref()))
        .with_stream_idle_timeout(server_config.stream_idle_timeout);

    tracing::info!(
        game_id = %context.game_id,
        model = %context.session_config.model,
        base_url = %llm_config.base_url(),
        stream_idle_timeout_secs = server_config.stream_idle_timeout.map(|t| t.as_secs()),
        "Game configured"
    );

    let game = runtime::spawn_game(context, GeminiSessionFactory::new(llm_config));
    let state = AppState::new(game);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], server_config.port));
    tracing::info!("Island Adventure listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
