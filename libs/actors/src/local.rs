//! In-process worker transport
//!
//! Runs each "worker" as a hosted [`ActorSystem`] on the current runtime,
//! connected to its launcher by unbounded channels. Message passing is
//! identical to the cross-process path — frames, readiness, dead letters
//! — without leaving the process. This is the single-process deployment
//! mode and the harness the integration tests drive.

use crate::error::LaunchError;
use crate::launch::{EntryPoint, MessagePort, WorkerLauncher};
use crate::system::{ActorSystem, InboxPort, Peer, SystemConfig};
use std::sync::Arc;
use tracing::debug;

/// Launches workers as hosted systems in this process
pub struct InProcessLauncher {
    bootstrap: Arc<dyn Fn() -> SystemConfig + Send + Sync>,
}

impl InProcessLauncher {
    /// `bootstrap` produces the configuration each launched worker boots
    /// with — the same role the worker script plays for a real process.
    pub fn new(bootstrap: impl Fn() -> SystemConfig + Send + Sync + 'static) -> Self {
        Self {
            bootstrap: Arc::new(bootstrap),
        }
    }
}

impl WorkerLauncher for InProcessLauncher {
    fn launch(
        &self,
        entry: &EntryPoint,
        host: Box<dyn MessagePort>,
    ) -> Result<Box<dyn MessagePort>, LaunchError> {
        debug!(location = %entry.location, "launching in-process worker");
        let worker = ActorSystem::hosted((self.bootstrap)(), host);
        Ok(Box::new(InboxPort {
            tx: worker.inbound_sender(),
            from: Peer::Host,
        }))
    }
}
