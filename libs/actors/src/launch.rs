//! Boundary collaborators: process creation and message channels
//!
//! The dispatch system never talks to a platform directly. It consumes a
//! [`WorkerLauncher`] to create worker processes and a [`MessagePort`]
//! per process for outbound frames. Two launchers ship with the crate:
//! [`crate::local::InProcessLauncher`] (workers as in-process systems,
//! used for tests and single-process deployments) and
//! [`crate::process::ChildProcessLauncher`] (real OS child processes over
//! stdio pipes).

use crate::error::{LaunchError, PortError};
use protocol::{Frame, TransferList};

/// Environment variable overriding the default worker entry point
pub const ENTRY_ENV: &str = "WORKER_ENTRY";

/// Where a worker process starts executing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    /// Script or executable location handed to the launcher
    pub location: String,
    /// Load the entry point with module semantics
    pub module: bool,
}

impl EntryPoint {
    pub fn new(location: impl Into<String>, module: bool) -> Self {
        Self {
            location: location.into(),
            module,
        }
    }

    /// Default entry point for actor types that do not declare one:
    /// the `WORKER_ENTRY` variable when set, otherwise the running
    /// executable itself.
    pub fn from_environment() -> Self {
        let location = std::env::var(ENTRY_ENV)
            .ok()
            .or_else(|| {
                std::env::current_exe()
                    .ok()
                    .map(|p| p.display().to_string())
            })
            .or_else(|| std::env::args().next())
            .unwrap_or_default();

        Self {
            location,
            module: false,
        }
    }
}

/// Outbound half of the raw two-way channel to one process.
///
/// Delivery is queued and fire-and-forget: `post` never blocks on the
/// receiving process. The transfer list names buffers that may be moved
/// instead of copied.
pub trait MessagePort: Send + Sync {
    fn post(&self, frame: Frame, transfer: TransferList) -> Result<(), PortError>;
}

/// Creates one worker process.
///
/// `host` is the channel the new worker uses to reach the process that
/// launched it (readiness announcements, replies). Implementations must
/// not call back into the launching system synchronously.
pub trait WorkerLauncher: Send + Sync {
    fn launch(
        &self,
        entry: &EntryPoint,
        host: Box<dyn MessagePort>,
    ) -> Result<Box<dyn MessagePort>, LaunchError>;
}
