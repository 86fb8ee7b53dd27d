//! Axum router configuration with middleware.
//!
//! REST routes are under `/api/v1/`; the socket gateway lives at `/ws`.
//! Middleware: CORS, tracing.

use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Chat list and conversation views
        .route("/chats/{user_id}", get(handlers::chat::get_chat_summaries))
        .route(
            "/conversations/{user_id}/{partner_id}",
            get(handlers::chat::get_conversation),
        )
        // REST message send
        .route("/messages", post(handlers::chat::send_message))
        // Presence snapshot
        .route("/presence/{user_id}", get(handlers::presence::get_presence));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/ws", get(handlers::ws::ws_handler))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn router_builds_against_a_fresh_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::init(Some(dir.path().to_path_buf())).await.unwrap();
        let _router = build_router(state);
    }
}
