// crates/server/src/lib.rs
//! Clawdeck server library.
//!
//! Axum-based HTTP backend for the agent monitoring dashboard: polling
//! endpoints for the session list and health, and SSE endpoints that live-
//! tail the runtime log and individual session transcripts.

pub mod admission;
pub mod config;
pub mod error;
pub mod routes;
pub mod sse;
pub mod state;
pub mod watch;

pub use admission::{StreamGate, StreamKind, StreamSlot};
pub use config::Config;
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::api_routes;
pub use state::AppState;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
pub fn create_app(config: Config) -> Router {
    create_app_with_state(AppState::new(config))
}

/// Like [`create_app`], but with caller-owned state (used by tests that
/// need a handle on the stream gate or summary cache).
pub fn create_app_with_state(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api_routes(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn test_config() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::for_root(dir.path());
        config.sessions_command = None;
        config.log_dir = dir.path().join("logs");
        (dir, config)
    }

    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        let (_dir, config) = test_config();
        let app = create_app(config);
        let (status, body) = get(app, "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert!(json["version"].is_string());
        assert!(json["uptime_secs"].is_number());
        assert_eq!(json["session_dir_exists"], false);
    }

    #[tokio::test]
    async fn sessions_endpoint_returns_array() {
        let (_dir, config) = test_config();
        let app = create_app(config);
        let (status, body) = get(app, "/api/sessions").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert!(json.is_array());
    }

    #[tokio::test]
    async fn session_stream_rejects_bad_id() {
        let (_dir, config) = test_config();
        let app = create_app(config);
        let (status, _) = get(app, "/api/session/..%2Fetc/stream").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (_dir, config) = test_config();
        let app = create_app(config);
        let (status, _) = get(app, "/api/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
