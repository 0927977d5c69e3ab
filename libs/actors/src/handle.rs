//! Worker process handle
//!
//! Owns the outbound side of one worker process: the message port, the
//! readiness flag, and the queue of frames posted before the worker
//! announced it could receive them.
//!
//! Readiness is monotonic. A worker announces readiness exactly once, at
//! startup; the queue flushes in FIFO order on that transition and is
//! never used again. There is no path back to not-ready — a worker
//! disappearing mid-session has no defined recovery in this protocol.

use crate::launch::MessagePort;
use protocol::{ActorName, Frame, TransferList};
use std::collections::VecDeque;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Readiness {
    NotReady,
    Ready,
}

/// Outbound handle for one worker process
pub struct WorkerHandle {
    name: ActorName,
    port: Box<dyn MessagePort>,
    readiness: Readiness,
    queued: VecDeque<(Frame, TransferList)>,
}

impl WorkerHandle {
    pub fn new(name: ActorName, port: Box<dyn MessagePort>) -> Self {
        Self {
            name,
            port,
            readiness: Readiness::NotReady,
            queued: VecDeque::new(),
        }
    }

    pub fn name(&self) -> &ActorName {
        &self.name
    }

    pub fn is_ready(&self) -> bool {
        self.readiness == Readiness::Ready
    }

    pub fn queued_len(&self) -> usize {
        self.queued.len()
    }

    /// Transmit immediately when ready, queue otherwise. Fire-and-forget
    /// either way.
    pub fn post(&mut self, frame: Frame, transfer: TransferList) {
        match self.readiness {
            Readiness::Ready => self.transmit(frame, transfer),
            Readiness::NotReady => {
                trace!(
                    worker = %self.name,
                    tag = frame.tag(),
                    queued = self.queued.len() + 1,
                    "worker not ready, queueing outbound frame"
                );
                self.queued.push_back((frame, transfer));
            }
        }
    }

    /// Apply a readiness signal from this worker.
    ///
    /// Panics if a ready worker signals not-ready: the process model has
    /// a worker announce readiness exactly once and never revoke it.
    pub fn set_ready(&mut self, ready: bool) {
        match (self.readiness, ready) {
            (Readiness::Ready, false) => {
                panic!(
                    "worker {} can become ready, but not not-ready again",
                    self.name
                );
            }
            (Readiness::Ready, true) => {
                debug!(worker = %self.name, "duplicate readiness announcement ignored");
            }
            (Readiness::NotReady, true) => {
                self.readiness = Readiness::Ready;
                debug!(
                    worker = %self.name,
                    flushing = self.queued.len(),
                    "worker ready, flushing queued frames"
                );
                while let Some((frame, transfer)) = self.queued.pop_front() {
                    self.transmit(frame, transfer);
                }
            }
            (Readiness::NotReady, false) => {}
        }
    }

    fn transmit(&self, frame: Frame, transfer: TransferList) {
        let tag = frame.tag();
        if let Err(e) = self.port.post(frame, transfer) {
            warn!(worker = %self.name, tag, error = %e, "failed to post frame to worker");
        }
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("name", &self.name)
            .field("readiness", &self.readiness)
            .field("queued", &self.queued.len())
            .finish()
    }
}
