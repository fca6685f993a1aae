// crates/server/src/config.rs
//! Server configuration: filesystem locations of the agent runtime and the
//! knobs that bound live streaming.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 18765;

/// Resolved server configuration.
///
/// Paths are derived from the agent root (`~/.openclaw` unless overridden),
/// so a test can point the whole server at a temp directory with
/// [`Config::for_root`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen port for the HTTP server.
    pub port: u16,
    /// Root of the agent installation (session files live beneath it).
    pub agent_root: PathBuf,
    /// Directory holding session transcript `.jsonl` files.
    pub session_dir: PathBuf,
    /// Session registry file (`sessions.json`) mapping ids to metadata.
    pub registry_file: PathBuf,
    /// Directory the runtime writes its dated log files into.
    pub log_dir: PathBuf,
    /// Log file name prefix (`<prefix>-YYYY-MM-DD.log`).
    pub log_prefix: String,
    /// Optional CLI command whose output lists sessions; when unset or
    /// failing, the session list falls back to a directory scan.
    pub sessions_command: Option<String>,
    /// Max concurrent runtime-log SSE streams.
    pub max_log_streams: usize,
    /// Max concurrent session-transcript SSE streams.
    pub max_session_streams: usize,
    /// Per-stream cap on log lines forwarded per second.
    pub max_log_lines_per_sec: usize,
    /// Lines of log backlog replayed to a new log stream.
    pub log_backlog_lines: usize,
    /// SSE keep-alive interval.
    pub heartbeat: Duration,
    /// Fallback poll interval for file change detection.
    pub poll_interval: Duration,
}

impl Config {
    /// Configuration rooted at the user's home agent installation.
    pub fn from_home() -> Self {
        let root = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".openclaw");
        Self::for_root(&root)
    }

    /// Configuration with every path derived from `root`.
    pub fn for_root(root: &Path) -> Self {
        let session_dir = root.join("agents").join("main").join("sessions");
        Self {
            port: DEFAULT_PORT,
            agent_root: root.to_path_buf(),
            registry_file: session_dir.join("sessions.json"),
            session_dir,
            log_dir: std::env::temp_dir().join("openclaw"),
            log_prefix: "openclaw".to_string(),
            sessions_command: Some("openclaw sessions".to_string()),
            max_log_streams: 2,
            max_session_streams: 3,
            max_log_lines_per_sec: 50,
            log_backlog_lines: 200,
            heartbeat: Duration::from_secs(15),
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_home()
    }
}
