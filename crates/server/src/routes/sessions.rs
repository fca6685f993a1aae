// crates/server/src/routes/sessions.rs
//! Session directory listing.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::Json;

use clawdeck_core::{
    dedupe_sessions, derive_labels, load_session_index, parse_cli_sessions, scan_session_files,
    SessionEntry,
};

use crate::error::ApiResult;
use crate::state::AppState;

const CLI_TIMEOUT: Duration = Duration::from_secs(5);

/// GET /api/sessions
///
/// Prefers the runtime's own `sessions` command output (it knows about
/// sessions whose transcripts live elsewhere); falls back to scanning the
/// transcript directory when the command is unset, fails, or times out.
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<SessionEntry>>> {
    let cli_output = match &state.config.sessions_command {
        Some(command) => run_sessions_command(command).await,
        None => None,
    };

    let state = Arc::clone(&state);
    let entries = tokio::task::spawn_blocking(move || {
        let config = &state.config;
        let mut entries = match &cli_output {
            Some(output) => parse_cli_sessions(output, &config.session_dir, &state.summaries),
            None => Vec::new(),
        };
        if entries.is_empty() {
            entries = scan_session_files(&config.session_dir, &state.summaries);
        }

        let index = load_session_index(&config.registry_file);
        derive_labels(&mut entries, &index);
        dedupe_sessions(entries)
    })
    .await
    .map_err(|e| anyhow::anyhow!("session scan task failed: {e}"))?;

    Ok(Json(entries))
}

/// Run the configured sessions command via the shell, returning stdout on
/// success. Failures are expected (CLI not installed, agent down) and only
/// logged at debug.
async fn run_sessions_command(command: &str) -> Option<String> {
    let run = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .output();

    match tokio::time::timeout(CLI_TIMEOUT, run).await {
        Ok(Ok(output)) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(Ok(output)) => {
            tracing::debug!(command, status = %output.status, "sessions command failed");
            None
        }
        Ok(Err(err)) => {
            tracing::debug!(command, %err, "sessions command could not run");
            None
        }
        Err(_) => {
            tracing::debug!(command, "sessions command timed out");
            None
        }
    }
}
