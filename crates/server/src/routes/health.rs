// crates/server/src/routes/health.rs
//! Liveness endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use clawdeck_core::today_log_path;

use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let today_log = today_log_path(&state.config.log_dir, &state.config.log_prefix);
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "session_dir_exists": state.config.session_dir.is_dir(),
        "today_log_exists": today_log.is_file(),
    }))
}
