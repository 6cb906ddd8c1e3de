pub mod config;
pub mod errors;
pub mod models;
pub mod routes;
pub mod service;
pub mod upstream;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::routes::api_routes::{ai_chat_handler, health_handler};
use crate::service::chat_service::ChatService;

/// All gateway routes, ready to be served.
pub fn router(service: ChatService) -> Router {
    Router::new()
        .route("/api/ai-chat", post(ai_chat_handler))
        .route("/healthz", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
