// crates/server/src/routes/logs.rs
//! Runtime log live tail over SSE.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::sse::{Event, Sse};
use futures_util::{Stream, StreamExt};

use clawdeck_core::{parse_log_line, resolve_log_file, tail_lines_before, RateWindow, TailReader};

use crate::admission::StreamKind;
use crate::sse::{keep_alive, StreamFrame};
use crate::state::AppState;
use crate::watch;

/// GET /api/logs/stream
pub async fn stream_logs(
    State(state): State<Arc<AppState>>,
) -> (
    [(header::HeaderName, &'static str); 1],
    Sse<impl Stream<Item = Result<Event, Infallible>>>,
) {
    let heartbeat = state.config.heartbeat;
    let stream = log_frames(state).map(|frame| Ok(frame.into_event()));
    (
        [(header::CACHE_CONTROL, "no-cache")],
        Sse::new(stream).keep_alive(keep_alive(heartbeat)),
    )
}

/// Frames for the log stream: bounded backlog replay, then live appends,
/// both rate-limited to the configured lines-per-second cap.
pub fn log_frames(state: Arc<AppState>) -> impl Stream<Item = StreamFrame> {
    async_stream::stream! {
        let Some(_slot) = state.streams.try_acquire(StreamKind::Log) else {
            let cap = state.streams.cap(StreamKind::Log);
            yield StreamFrame::warn(format!(
                "Too many log streams ({cap} max). Close another tab and retry."
            ));
            return;
        };

        let config = &state.config;
        let Some(path) = resolve_log_file(&config.log_dir, &config.log_prefix) else {
            yield StreamFrame::warn(format!(
                "No log file available under {}",
                config.log_dir.display()
            ));
            return;
        };

        let mut reader = match TailReader::from_end(&path).await {
            Ok(reader) => reader,
            Err(err) => {
                yield StreamFrame::error(format!("Cannot open {}: {err}", path.display()));
                return;
            }
        };

        let mut rate = RateWindow::new(config.max_log_lines_per_sec);

        // Backlog is bounded by the live reader's starting offset, so a
        // line landing between the two reads is delivered exactly once.
        match tail_lines_before(&path, config.log_backlog_lines, reader.offset()).await {
            Ok(backlog) => {
                for line in backlog {
                    // Blank lines carry nothing and must not eat rate budget.
                    if line.trim().is_empty() {
                        continue;
                    }
                    if rate.allow() {
                        yield StreamFrame::Log(parse_log_line(&line));
                    }
                }
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "log backlog read failed");
            }
        }

        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        let watcher = watch::watch_path(&path, tx);
        let mut watcher_alive = watcher.is_some();
        let mut poll = tokio::time::interval(config.poll_interval);
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
                    tracing::warn!(path = %path.display(), %err, "log read failed");
                    continue;
                }
            };
            for line in lines {
                if line.trim().is_empty() {
                    continue;
                }
                if rate.allow() {
                    yield StreamFrame::Log(parse_log_line(&line));
                }
            }
        }
    }
}
