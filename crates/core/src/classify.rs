// crates/core/src/classify.rs
//! Coarse classification of raw log lines into event tags.
//!
//! The classifier is a pure keyword scan: case-insensitive substring match
//! against an ordered rule list, first match wins. Rule order matters —
//! `error` and `warn` are generic and would shadow the lifecycle keywords
//! if they were checked first.

use serde::Serialize;

/// Coarse event category for a single log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTag {
    Enqueue,
    Dequeue,
    RunStart,
    RunDone,
    ToolStart,
    ToolEnd,
    SessionState,
    Error,
    Warn,
    Other,
}

impl EventTag {
    /// Wire form used in SSE `log` payloads (`"run_start"`, `"error"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            EventTag::Enqueue => "enqueue",
            EventTag::Dequeue => "dequeue",
            EventTag::RunStart => "run_start",
            EventTag::RunDone => "run_done",
            EventTag::ToolStart => "tool_start",
            EventTag::ToolEnd => "tool_end",
            EventTag::SessionState => "session_state",
            EventTag::Error => "error",
            EventTag::Warn => "warn",
            EventTag::Other => "other",
        }
    }
}

/// Classify a raw log line. Total and deterministic; never fails.
pub fn classify(line: &str) -> EventTag {
    let ll = line.to_lowercase();
    if ll.contains("enqueue") {
        return EventTag::Enqueue;
    }
    if ll.contains("dequeue") {
        return EventTag::Dequeue;
    }
    if ll.contains("run start") || ll.contains("run_start") {
        return EventTag::RunStart;
    }
    if ll.contains("run done") || ll.contains("run_done") {
        return EventTag::RunDone;
    }
    if ll.contains("tool start") || ll.contains("tool_start") {
        return EventTag::ToolStart;
    }
    if ll.contains("tool end") || ll.contains("tool_end") {
        return EventTag::ToolEnd;
    }
    if ll.contains("session state") {
        return EventTag::SessionState;
    }
    if ll.contains("error") {
        return EventTag::Error;
    }
    if ll.contains("warn") {
        return EventTag::Warn;
    }
    EventTag::Other
}
