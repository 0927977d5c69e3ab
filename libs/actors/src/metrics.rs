//! Dispatch metrics
//!
//! Lightweight atomic counters for the call/reply traffic a system
//! handles. Readable at any time without locking dispatch state.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one dispatch system
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Calls handed to worker handles for transmission
    pub calls_sent: AtomicU64,
    /// Replies that resolved a pending call
    pub replies_matched: AtomicU64,
    /// Replies with no pending entry, silently discarded
    pub replies_discarded: AtomicU64,
    /// Inbound calls queued for a not-yet-registered recipient
    pub dead_letters_queued: AtomicU64,
    /// Dead letters dispatched after their recipient registered
    pub dead_letters_drained: AtomicU64,
    /// Invocations that resolved their caller with a fault
    pub faults_returned: AtomicU64,
}

impl DispatchMetrics {
    pub fn record_call_sent(&self) {
        self.calls_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reply_matched(&self) {
        self.replies_matched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reply_discarded(&self) {
        self.replies_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dead_letter_queued(&self) {
        self.dead_letters_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dead_letter_drained(&self) {
        self.dead_letters_drained.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fault_returned(&self) {
        self.faults_returned.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot for logging and assertions
    pub fn snapshot(&self) -> DispatchStats {
        DispatchStats {
            calls_sent: self.calls_sent.load(Ordering::Relaxed),
            replies_matched: self.replies_matched.load(Ordering::Relaxed),
            replies_discarded: self.replies_discarded.load(Ordering::Relaxed),
            dead_letters_queued: self.dead_letters_queued.load(Ordering::Relaxed),
            dead_letters_drained: self.dead_letters_drained.load(Ordering::Relaxed),
            faults_returned: self.faults_returned.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`DispatchMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub calls_sent: u64,
    pub replies_matched: u64,
    pub replies_discarded: u64,
    pub dead_letters_queued: u64,
    pub dead_letters_drained: u64,
    pub faults_returned: u64,
}
