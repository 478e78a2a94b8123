//! Queued backend: two in-process FIFOs for host-driven sessions.

use std::collections::VecDeque;
use std::sync::Mutex;

/// In-memory inbound/outbound queues. Color arguments are ignored by this
/// backend; text lands in the outbound queue exactly as filtered.
#[derive(Debug, Default)]
pub struct QueuedBackend {
    inbound: Mutex<VecDeque<String>>,
    outbound: Mutex<VecDeque<String>>,
}

impl QueuedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_input(&self, line: String) {
        self.inbound
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(line);
    }

    /// Pops the oldest inbound line, `None` when the queue is empty.
    pub fn pop_input(&self) -> Option<String> {
        self.inbound
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
    }

    pub fn push_output(&self, text: String) {
        self.outbound
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(text);
    }

    /// Drains the outbound queue into one string, oldest first.
    pub fn drain_output(&self) -> String {
        self.outbound
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    /// Oldest pending outbound fragment, without consuming it.
    pub fn peek_output(&self) -> Option<String> {
        self.outbound
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .front()
            .cloned()
    }

    pub fn clear(&self) {
        self.inbound
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
        self.outbound
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }
}
