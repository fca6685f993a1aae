// crates/server/src/routes/session_stream.rs
//! Per-session transcript streaming over SSE: full replay, a
//! `history_done` marker, then live appends.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::sse::{Event, Sse};
use futures_util::{Stream, StreamExt};

use clawdeck_core::{find_session_file, parse_transcript_line, TailReader};

use crate::admission::StreamKind;
use crate::error::{ApiError, ApiResult};
use crate::sse::{keep_alive, StreamFrame};
use crate::state::AppState;
use crate::watch;

/// GET /api/session/{session_id}/stream
pub async fn stream_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> ApiResult<(
    [(header::HeaderName, &'static str); 1],
    Sse<impl Stream<Item = Result<Event, Infallible>>>,
)> {
    // Reject path-shaped ids before committing to an SSE response.
    if session_id.is_empty()
        || session_id.contains('/')
        || session_id.contains('\\')
        || session_id.contains("..")
    {
        return Err(ApiError::BadRequest(format!(
            "invalid session id: {session_id:?}"
        )));
    }

    let heartbeat = state.config.heartbeat;
    let stream = session_frames(state, session_id).map(|frame| Ok(frame.into_event()));
    Ok((
        [(header::CACHE_CONTROL, "no-cache")],
        Sse::new(stream).keep_alive(keep_alive(heartbeat)),
    ))
}

/// Frames for one session's stream. Replay is not rate-limited: the client
/// asked for the whole transcript.
pub fn session_frames(
    state: Arc<AppState>,
    session_id: String,
) -> impl Stream<Item = StreamFrame> {
    async_stream::stream! {
        let Some(_slot) = state.streams.try_acquire(StreamKind::Session) else {
            let cap = state.streams.cap(StreamKind::Session);
            yield StreamFrame::warn(format!(
                "Too many session streams ({cap} max). Close another tab and retry."
            ));
            return;
        };

        let config = state.config.clone();
        let lookup_id = session_id.clone();
        let found = tokio::task::spawn_blocking(move || {
            find_session_file(&config.session_dir, &config.agent_root, &lookup_id)
        })
        .await
        .ok()
        .flatten();

        let Some(path) = found else {
            yield StreamFrame::error(format!("Session file not found: {session_id}"));
            return;
        };

        // The reader starts at offset 0: its first drain is the replay, and
        // the retained offset makes the live phase continue exactly where
        // replay stopped.
        let mut reader = TailReader::from_start(&path);
        match reader.read_new_lines().await {
            Ok(lines) => {
                for line in lines {
                    if let Some(event) = parse_transcript_line(&line) {
                        yield StreamFrame::Session(event);
                    }
                }
            }
            Err(err) => {
                yield StreamFrame::error(format!("Cannot read {}: {err}", path.display()));
                return;
            }
        }
        yield StreamFrame::HistoryDone;

        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        let watcher = watch::watch_path(&path, tx);
        let mut watcher_alive = watcher.is_some();
        let mut poll = tokio::time::interval(state.config.poll_interval);
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                changed = rx.recv(), if watcher_alive => {
                    if changed.is_none() {
                        watcher_alive = false;
                    }
                }
                _ = poll.tick() => {}
            }

            let lines = match reader.read_new_lines().await {
                Ok(lines) => lines,
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "session read failed");
                    continue;
                }
            };
            for line in lines {
                if let Some(event) = parse_transcript_line(&line) {
                    yield StreamFrame::Session(event);
                }
            }
        }
    }
}
