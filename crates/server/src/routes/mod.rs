// crates/server/src/routes/mod.rs
//! HTTP route registration.

pub mod health;
pub mod logs;
pub mod session_stream;
pub mod sessions;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// All API routes under `/api`.
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/sessions", get(sessions::list_sessions))
        .route("/api/logs/stream", get(logs::stream_logs))
        .route(
            "/api/session/{session_id}/stream",
            get(session_stream::stream_session),
        )
        .with_state(state)
}
