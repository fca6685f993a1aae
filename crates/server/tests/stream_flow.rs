// crates/server/tests/stream_flow.rs
//! Stream-level tests: replay/live handoff, admission control, and rate
//! limiting, exercised directly on the frame builders.

use std::io::Write;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Stream, StreamExt};

use clawdeck_core::today_log_path;
use clawdeck_server::routes::logs::log_frames;
use clawdeck_server::routes::session_stream::session_frames;
use clawdeck_server::sse::{StatusLevel, StreamFrame};
use clawdeck_server::{AppState, Config, StreamKind};

const SID: &str = "11111111-2222-3333-4444-555555555555";

fn test_state(root: &Path) -> Arc<AppState> {
    let mut config = Config::for_root(root);
    config.sessions_command = None;
    config.log_dir = root.join("logs");
    config.poll_interval = Duration::from_millis(20);
    AppState::new(config)
}

fn append(path: &Path, text: &str) {
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    write!(f, "{text}").unwrap();
    f.flush().unwrap();
}

async fn next_frame(stream: &mut Pin<Box<dyn Stream<Item = StreamFrame> + Send>>) -> StreamFrame {
    tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("frame within deadline")
        .expect("stream still open")
}

async fn assert_quiet(stream: &mut Pin<Box<dyn Stream<Item = StreamFrame> + Send>>) {
    let extra = tokio::time::timeout(Duration::from_millis(250), stream.next()).await;
    assert!(extra.is_err(), "unexpected frame: {:?}", extra.unwrap());
}

#[tokio::test]
async fn session_stream_replays_then_tails_without_gap_or_duplicate() {
    let root = tempfile::tempdir().unwrap();
    let state = test_state(root.path());
    std::fs::create_dir_all(&state.config.session_dir).unwrap();
    let transcript = state.config.session_dir.join(format!("{SID}.jsonl"));
    append(
        &transcript,
        concat!(
            r#"{"type":"message","message":{"role":"user","content":"deploy"}}"#,
            "\n",
            r#"{"type":"message","message":{"role":"assistant","content":"on it"}}"#,
            "\n",
        ),
    );

    let mut stream: Pin<Box<dyn Stream<Item = StreamFrame> + Send>> =
        Box::pin(session_frames(state, SID.to_string()));

    assert!(matches!(next_frame(&mut stream).await, StreamFrame::Session(_)));
    assert!(matches!(next_frame(&mut stream).await, StreamFrame::Session(_)));
    assert_eq!(next_frame(&mut stream).await, StreamFrame::HistoryDone);
    assert_quiet(&mut stream).await;

    append(
        &transcript,
        concat!(
            r#"{"type":"message","message":{"role":"assistant","content":"done"}}"#,
            "\n",
        ),
    );
    match next_frame(&mut stream).await {
        StreamFrame::Session(event) => assert_eq!(event.role, "assistant"),
        other => panic!("expected live session frame, got {other:?}"),
    }
    assert_quiet(&mut stream).await;
}

#[tokio::test]
async fn session_stream_reports_missing_file() {
    let root = tempfile::tempdir().unwrap();
    let state = test_state(root.path());

    let mut stream: Pin<Box<dyn Stream<Item = StreamFrame> + Send>> =
        Box::pin(session_frames(state, SID.to_string()));

    match next_frame(&mut stream).await {
        StreamFrame::Status { level, message } => {
            assert_eq!(level, StatusLevel::Error);
            assert!(message.contains(SID));
        }
        other => panic!("expected error status, got {other:?}"),
    }
    // The stream ends after the error.
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn session_stream_over_capacity_warns_and_slot_frees_on_drop() {
    let root = tempfile::tempdir().unwrap();
    let state = test_state(root.path());
    let cap = state.config.max_session_streams;

    let slots: Vec<_> = (0..cap)
        .map(|_| state.streams.try_acquire(StreamKind::Session).unwrap())
        .collect();

    let mut stream: Pin<Box<dyn Stream<Item = StreamFrame> + Send>> =
        Box::pin(session_frames(Arc::clone(&state), SID.to_string()));
    match next_frame(&mut stream).await {
        StreamFrame::Status { level, message } => {
            assert_eq!(level, StatusLevel::Warn);
            assert!(message.contains("Too many session streams"));
        }
        other => panic!("expected warn status, got {other:?}"),
    }
    assert!(stream.next().await.is_none());

    drop(slots);
    assert_eq!(state.streams.active(StreamKind::Session), 0);
}

#[tokio::test]
async fn log_stream_replays_backlog_then_live_appends() {
    let root = tempfile::tempdir().unwrap();
    let state = test_state(root.path());
    std::fs::create_dir_all(&state.config.log_dir).unwrap();
    let log = today_log_path(&state.config.log_dir, &state.config.log_prefix);
    append(&log, "09:00:00 run start\n09:00:01 tool start\n");

    let mut stream: Pin<Box<dyn Stream<Item = StreamFrame> + Send>> =
        Box::pin(log_frames(Arc::clone(&state)));

    match next_frame(&mut stream).await {
        StreamFrame::Log(record) => assert_eq!(record["type"], "run_start"),
        other => panic!("expected log frame, got {other:?}"),
    }
    match next_frame(&mut stream).await {
        StreamFrame::Log(record) => assert_eq!(record["type"], "tool_start"),
        other => panic!("expected log frame, got {other:?}"),
    }
    assert_quiet(&mut stream).await;

    append(&log, "09:00:02 run done\n");
    match next_frame(&mut stream).await {
        StreamFrame::Log(record) => assert_eq!(record["type"], "run_done"),
        other => panic!("expected live log frame, got {other:?}"),
    }
}

#[tokio::test]
async fn log_stream_skips_blank_lines() {
    let root = tempfile::tempdir().unwrap();
    let state = test_state(root.path());
    std::fs::create_dir_all(&state.config.log_dir).unwrap();
    let log = today_log_path(&state.config.log_dir, &state.config.log_prefix);
    append(&log, "real line\n\n\nanother\n");

    let mut stream: Pin<Box<dyn Stream<Item = StreamFrame> + Send>> =
        Box::pin(log_frames(Arc::clone(&state)));

    match next_frame(&mut stream).await {
        StreamFrame::Log(record) => assert_eq!(record["raw"], "real line"),
        other => panic!("expected log frame, got {other:?}"),
    }
    match next_frame(&mut stream).await {
        StreamFrame::Log(record) => assert_eq!(record["raw"], "another"),
        other => panic!("expected log frame, got {other:?}"),
    }
    assert_quiet(&mut stream).await;

    // Live phase skips blanks too.
    append(&log, "\n   \nlive\n");
    match next_frame(&mut stream).await {
        StreamFrame::Log(record) => assert_eq!(record["raw"], "live"),
        other => panic!("expected live log frame, got {other:?}"),
    }
    assert_quiet(&mut stream).await;
}

#[tokio::test]
async fn log_stream_drops_lines_past_rate_cap() {
    let root = tempfile::tempdir().unwrap();
    let mut config = Config::for_root(root.path());
    config.sessions_command = None;
    config.log_dir = root.path().join("logs");
    config.poll_interval = Duration::from_millis(20);
    config.max_log_lines_per_sec = 5;
    config.log_backlog_lines = 100;
    let state = AppState::new(config);

    std::fs::create_dir_all(&state.config.log_dir).unwrap();
    let log = today_log_path(&state.config.log_dir, &state.config.log_prefix);
    for i in 0..15 {
        append(&log, &format!("line {i}\n"));
    }

    let mut stream: Pin<Box<dyn Stream<Item = StreamFrame> + Send>> =
        Box::pin(log_frames(Arc::clone(&state)));

    for _ in 0..5 {
        assert!(matches!(next_frame(&mut stream).await, StreamFrame::Log(_)));
    }
    // The remaining backlog is shed, not queued.
    assert_quiet(&mut stream).await;
}

#[tokio::test]
async fn log_stream_warns_when_no_log_file() {
    let root = tempfile::tempdir().unwrap();
    let state = test_state(root.path());

    let mut stream: Pin<Box<dyn Stream<Item = StreamFrame> + Send>> =
        Box::pin(log_frames(state));

    match next_frame(&mut stream).await {
        StreamFrame::Status { level, message } => {
            assert_eq!(level, StatusLevel::Warn);
            assert!(message.contains("No log file available"));
        }
        other => panic!("expected warn status, got {other:?}"),
    }
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn log_stream_over_capacity_warns() {
    let root = tempfile::tempdir().unwrap();
    let state = test_state(root.path());
    let cap = state.config.max_log_streams;

    let _slots: Vec<_> = (0..cap)
        .map(|_| state.streams.try_acquire(StreamKind::Log).unwrap())
        .collect();

    let mut stream: Pin<Box<dyn Stream<Item = StreamFrame> + Send>> =
        Box::pin(log_frames(Arc::clone(&state)));
    match next_frame(&mut stream).await {
        StreamFrame::Status { level, message } => {
            assert_eq!(level, StatusLevel::Warn);
            assert!(message.contains("Too many log streams"));
        }
        other => panic!("expected warn status, got {other:?}"),
    }
}
