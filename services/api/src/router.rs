//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the chat API, the voice WebSocket endpoint, and OpenAPI documentation.

use crate::{
    handlers,
    models::{ChatRequest, ChatResponse, ErrorResponse, HealthResponse, HistoryMessage, HistoryRole},
    state::AppState,
    ws::ws_handler,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(handlers::chat, handlers::health),
    components(
        schemas(ChatRequest, ChatResponse, HistoryMessage, HistoryRole, HealthResponse, ErrorResponse)
    ),
    tags(
        (name = "Digital Twin API", description = "Text chat and health endpoints of the digital twin. Voice runs over the `/voice` WebSocket.")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route("/chat", post(handlers::chat))
        .route("/voice", get(ws_handler))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(handlers::health))
        .merge(api_router)
}
