// crates/server/src/admission.rs
//! Admission control for live SSE streams.
//!
//! Each stream kind has its own concurrency cap. A successful acquire hands
//! back a [`StreamSlot`] guard; dropping the guard releases the slot, so a
//! client disconnect (which drops the response stream) frees capacity
//! without any explicit cleanup path.

use std::sync::{Arc, Mutex};

/// The two kinds of live streams the server serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Runtime log tail (`/api/logs/stream`).
    Log,
    /// Per-session transcript tail (`/api/session/{id}/stream`).
    Session,
}

#[derive(Debug, Default)]
struct Counts {
    logs: usize,
    sessions: usize,
}

/// Caps and counters for concurrent streams.
#[derive(Debug)]
pub struct StreamGate {
    max_logs: usize,
    max_sessions: usize,
    counts: Mutex<Counts>,
}

impl StreamGate {
    pub fn new(max_logs: usize, max_sessions: usize) -> Arc<Self> {
        Arc::new(Self {
            max_logs,
            max_sessions,
            counts: Mutex::new(Counts::default()),
        })
    }

    /// Try to claim a slot. `None` means the cap for that kind is reached.
    pub fn try_acquire(self: &Arc<Self>, kind: StreamKind) -> Option<StreamSlot> {
        let mut counts = self.counts.lock().unwrap();
        let (current, cap) = match kind {
            StreamKind::Log => (&mut counts.logs, self.max_logs),
            StreamKind::Session => (&mut counts.sessions, self.max_sessions),
        };
        if *current >= cap {
            return None;
        }
        *current += 1;
        Some(StreamSlot {
            gate: Arc::clone(self),
            kind,
        })
    }

    /// Number of active streams of the given kind.
    pub fn active(&self, kind: StreamKind) -> usize {
        let counts = self.counts.lock().unwrap();
        match kind {
            StreamKind::Log => counts.logs,
            StreamKind::Session => counts.sessions,
        }
    }

    /// Cap for the given kind (used in over-capacity messages).
    pub fn cap(&self, kind: StreamKind) -> usize {
        match kind {
            StreamKind::Log => self.max_logs,
            StreamKind::Session => self.max_sessions,
        }
    }

    fn release(&self, kind: StreamKind) {
        let mut counts = self.counts.lock().unwrap();
        let current = match kind {
            StreamKind::Log => &mut counts.logs,
            StreamKind::Session => &mut counts.sessions,
        };
        *current = current.saturating_sub(1);
    }
}

/// RAII guard for an admitted stream.
#[derive(Debug)]
pub struct StreamSlot {
    gate: Arc<StreamGate>,
    kind: StreamKind,
}

impl Drop for StreamSlot {
    fn drop(&mut self) {
        self.gate.release(self.kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquires_up_to_cap_then_refuses() {
        let gate = StreamGate::new(2, 3);

        let a = gate.try_acquire(StreamKind::Log).unwrap();
        let _b = gate.try_acquire(StreamKind::Log).unwrap();
        assert!(gate.try_acquire(StreamKind::Log).is_none());
        assert_eq!(gate.active(StreamKind::Log), 2);

        drop(a);
        assert_eq!(gate.active(StreamKind::Log), 1);
        assert!(gate.try_acquire(StreamKind::Log).is_some());
    }

    #[test]
    fn kinds_are_independent() {
        let gate = StreamGate::new(1, 1);

        let _log = gate.try_acquire(StreamKind::Log).unwrap();
        // Exhausting logs leaves session capacity untouched.
        let _session = gate.try_acquire(StreamKind::Session).unwrap();
        assert!(gate.try_acquire(StreamKind::Log).is_none());
        assert!(gate.try_acquire(StreamKind::Session).is_none());
    }

    #[test]
    fn slot_releases_on_drop_even_mid_scope() {
        let gate = StreamGate::new(1, 1);
        {
            let _slot = gate.try_acquire(StreamKind::Session).unwrap();
            assert_eq!(gate.active(StreamKind::Session), 1);
        }
        assert_eq!(gate.active(StreamKind::Session), 0);
    }

    #[test]
    fn reports_caps() {
        let gate = StreamGate::new(2, 3);
        assert_eq!(gate.cap(StreamKind::Log), 2);
        assert_eq!(gate.cap(StreamKind::Session), 3);
    }
}
