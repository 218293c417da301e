//! Main Entrypoint for the Digital Twin API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Loading the persona prompt.
//! 3. Initializing the chat client and the real-time voice connector.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use gemini_realtime::GeminiLiveConnector;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use twin_api::{config::Config, router::create_router, state::AppState};
use twin_core::{
    generic_types::{LiveSessionConfig, ResponseModality},
    llm_client::OpenAICompatibleClient,
};

const GEMINI_OPENAI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 2. Load Persona ---
    let prompt_path = config.system_prompt_path();
    let system_prompt = std::fs::read_to_string(&prompt_path)
        .with_context(|| format!("Could not read persona prompt at {}", prompt_path.display()))?;
    let system_prompt = Arc::new(system_prompt);

    // --- 3. Initialize Backend Clients ---
    let openai_config = OpenAIConfig::new()
        .with_api_key(&config.gemini_api_key)
        .with_api_base(GEMINI_OPENAI_BASE);
    let chat_client = Arc::new(OpenAICompatibleClient::new(
        openai_config,
        config.chat_model.clone(),
    ));
    let connector = Arc::new(GeminiLiveConnector::new(config.gemini_api_key.clone()));

    let live_config = Arc::new(LiveSessionConfig {
        model: config.live_model.clone(),
        instructions: system_prompt.to_string(),
        voice_name: config.voice_name.clone(),
        response_modality: ResponseModality::Audio,
    });

    let app_state = Arc::new(AppState {
        chat_client,
        connector,
        system_prompt,
        live_config,
    });

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(
        chat_model = %config.chat_model,
        live_model = %config.live_model,
        voice = %config.voice_name,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
