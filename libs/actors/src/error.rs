//! Dispatch-layer errors
//!
//! Recoverable conditions get typed errors; invariant violations (double
//! registration, a call sent before resolution, readiness regression)
//! panic instead, because the protocol defines no recovery for them.

use protocol::{ActorName, CallFault};
use thiserror::Error;
use wire::CodecError;

/// Failure to resolve an actor to a local instance or worker handle
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The worker process could not be created. Recoverable: the caller
    /// may retry or fall back.
    #[error("failed to launch worker for {name}: {source}")]
    Launch {
        name: ActorName,
        #[source]
        source: LaunchError,
    },
}

/// Failure surfaced by a remote (or table-dispatched local) call
#[derive(Debug, Error)]
pub enum CallError {
    /// The invocation ran and failed; the fault came back through the
    /// reply channel
    #[error("call faulted: {0}")]
    Fault(#[from] CallFault),

    /// The reply arrived but its value did not decode as the expected type
    #[error("failed to decode reply value: {0}")]
    ReplyDecode(#[source] CodecError),

    /// The dispatch system shut down before a reply arrived
    #[error("dispatch system shut down before a reply arrived")]
    SystemShutDown,
}

/// Worker process creation failures
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The entry point could not be loaded as a worker
    #[error("unable to load worker entry point {location} (module: {module}): {reason}")]
    UnableToLoad {
        location: String,
        module: bool,
        reason: String,
    },

    /// The underlying process could not be spawned
    #[error("failed to spawn worker process {location}: {source}")]
    Spawn {
        location: String,
        #[source]
        source: std::io::Error,
    },
}

/// Message channel failures
#[derive(Debug, Error)]
pub enum PortError {
    /// The far side of the channel is gone
    #[error("message channel closed")]
    Closed,
}
