// crates/core/src/lib.rs
//! Core parsing and classification engine for the clawdeck monitor.
//!
//! Everything in this crate is HTTP-agnostic: it turns append-only JSONL
//! transcript files and plain-text log files into structured records, and
//! provides the file-tailing primitives the server streams from.

pub mod classify;
pub mod directory;
pub mod logs;
pub mod summary;
pub mod tail;
pub mod timestamp;
pub mod transcript;

pub use classify::{classify, EventTag};
pub use directory::{
    dedupe_sessions, derive_labels, find_session_file, load_session_index, parse_cli_sessions,
    scan_session_files, SessionEntry, SessionMeta,
};
pub use logs::{parse_log_line, resolve_log_file, today_log_path, RateWindow};
pub use summary::{SessionStatus, SessionSummary, SummaryCache, UsageTotals};
pub use tail::{tail_lines, tail_lines_before, TailReader};
pub use timestamp::{timestamp_from_line, timestamp_from_value};
pub use transcript::{parse_transcript_line, ContentBlock, SessionEvent};
