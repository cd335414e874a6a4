//! API routes

pub mod chat;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{state::AppState, websocket::ws_handler};

use stayline_shared::MAX_ATTACHMENT_BYTES;

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    // Health check routes (at root level for infrastructure monitoring)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    // Chat API routes - under /api/v1
    let api_v1_routes = Router::new()
        .route("/chat/sessions", post(chat::create_session))
        .route("/chat/sessions", get(chat::list_sessions))
        .route("/chat/sessions/:session_id/identity", patch(chat::update_identity))
        .route("/chat/sessions/:session_id/assign", post(chat::assign_session))
        .route("/chat/sessions/:session_id/messages", get(chat::get_messages))
        .route("/chat/sessions/:session_id/messages", post(chat::append_message))
        .route("/chat/sessions/:session_id/attachments", post(chat::upload_attachment));

    // WebSocket route (role/scope declared via query parameters)
    let websocket_routes = Router::new().route("/ws/chat", get(ws_handler));

    let cors = match state
        .config
        .allowed_origin
        .as_deref()
        .and_then(|o| o.parse::<HeaderValue>().ok())
    {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::permissive(),
    };

    Router::new()
        .merge(health_routes)
        .merge(websocket_routes)
        .nest("/api/v1", api_v1_routes)
        // Attachment ceiling plus headroom for multipart framing
        .layer(DefaultBodyLimit::max(MAX_ATTACHMENT_BYTES + 64 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
