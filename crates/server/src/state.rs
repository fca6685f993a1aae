// crates/server/src/state.rs
//! Shared application state threaded through every route handler.

use std::sync::Arc;
use std::time::Instant;

use clawdeck_core::SummaryCache;

use crate::admission::StreamGate;
use crate::config::Config;

/// State shared across all requests.
pub struct AppState {
    pub config: Config,
    /// Mtime-keyed cache of session summaries.
    pub summaries: SummaryCache,
    /// Admission control for live SSE streams.
    pub streams: Arc<StreamGate>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Arc<Self> {
        let streams = StreamGate::new(config.max_log_streams, config.max_session_streams);
        Arc::new(Self {
            config,
            summaries: SummaryCache::new(),
            streams,
            start_time: Instant::now(),
        })
    }
}
