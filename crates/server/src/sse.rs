// crates/server/src/sse.rs
//! Typed SSE frames.
//!
//! Stream builders yield [`StreamFrame`] values so stream logic can be
//! tested directly; handlers map frames to `axum` [`Event`]s at the edge.

use std::time::Duration;

use axum::response::sse::{Event, KeepAlive};
use serde_json::{json, Value};

use clawdeck_core::SessionEvent;

/// Severity of an out-of-band status frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Warn,
    Error,
}

impl StatusLevel {
    fn as_str(self) -> &'static str {
        match self {
            StatusLevel::Warn => "warn",
            StatusLevel::Error => "error",
        }
    }
}

/// One frame of a live stream, before SSE encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    /// A structured runtime log record.
    Log(Value),
    /// A parsed transcript event.
    Session(SessionEvent),
    /// Marker separating transcript replay from live appends.
    HistoryDone,
    /// Out-of-band condition reported to the client (over capacity,
    /// missing file).
    Status {
        level: StatusLevel,
        message: String,
    },
}

impl StreamFrame {
    pub fn warn(message: impl Into<String>) -> Self {
        StreamFrame::Status {
            level: StatusLevel::Warn,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StreamFrame::Status {
            level: StatusLevel::Error,
            message: message.into(),
        }
    }

    /// Encode as an SSE event.
    pub fn into_event(self) -> Event {
        match self {
            StreamFrame::Log(record) => Event::default()
                .event("log")
                .data(record.to_string()),
            StreamFrame::Session(event) => Event::default()
                .event("session_event")
                .data(serde_json::to_string(&event).unwrap_or_else(|_| "{}".into())),
            StreamFrame::HistoryDone => Event::default().event("history_done").data("{}"),
            StreamFrame::Status { level, message } => Event::default().event("status").data(
                json!({ "type": level.as_str(), "message": message }).to_string(),
            ),
        }
    }
}

/// Keep-alive comment frames at the given interval.
pub fn keep_alive(interval: Duration) -> KeepAlive {
    KeepAlive::new().interval(interval).text("heartbeat")
}
