//! Call and reply envelopes
//!
//! A [`CallEnvelope`] carries one remote invocation: who is being called,
//! which method, and the encoded argument list. A [`ReplyEnvelope`]
//! carries the outcome back, matched to its originating call by
//! [`CallId`]. Envelopes are immutable once constructed; they cross the
//! process boundary by value and never share state.

use crate::identity::ActorName;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use wire::{CodecError, WireValue};

/// Correlates a reply with the call that issued it.
///
/// Unique among calls in flight from the originating process: ids are
/// drawn from a per-process monotonic counter, and replies are routed
/// back to the process that issued the call, so no cross-process
/// coordination is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(u64);

impl CallId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call-{}", self.0)
    }
}

/// One remote method invocation, encoded for transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEnvelope {
    pub call_id: CallId,
    /// Identity of the actor being called
    pub recipient: ActorName,
    /// Method identifier on the recipient
    pub target: String,
    /// Type names substituted for the target's generic parameters
    pub generic_subs: Vec<String>,
    /// Positional arguments in structured form
    pub args: Vec<WireValue>,
}

/// Typed failure carried through the reply channel.
///
/// A thrown application error resolves the caller's suspended call with
/// this fault instead of leaving it hanging.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct CallFault {
    pub kind: String,
    pub message: String,
}

impl CallFault {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Failure raised by the method body itself
    pub fn application(message: impl Into<String>) -> Self {
        Self::new("application", message)
    }
}

impl From<CodecError> for CallFault {
    fn from(err: CodecError) -> Self {
        Self::new("decode", err.to_string())
    }
}

impl From<anyhow::Error> for CallFault {
    fn from(err: anyhow::Error) -> Self {
        Self::application(format!("{err:#}"))
    }
}

/// Outcome of a remote invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReplyPayload {
    /// Successful return; `None` for methods that return nothing
    Return(Option<WireValue>),
    /// The invocation failed; the fault resolves the waiting caller
    Fault(CallFault),
}

/// Reply to a [`CallEnvelope`], matched by call id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    pub call_id: CallId,
    /// Identity of the actor that executed the call, when known
    pub sender: Option<ActorName>,
    pub payload: ReplyPayload,
}
