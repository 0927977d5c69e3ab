//! Call/Reply Envelope Protocol
//!
//! Wire-level message shapes for the worker-actor system: actor
//! identities, the call and reply envelopes, and the tagged frame union
//! that crosses the process boundary.
//!
//! # Message flow
//!
//! ```text
//! ┌──────────────┐  remoteCall{callID, recipient, target, args}  ┌──────────────┐
//! │  Dispatcher  │──────────────────────────────────────────────▶│    Worker    │
//! │   (host)     │                                               │   process    │
//! │              │◀──────────────────────────────────────────────│              │
//! └──────────────┘        reply{callID, value | fault}           └──────────────┘
//! ```
//!
//! A worker announces `processReady` exactly once at startup; the host
//! sends `initialize` naming the actor the worker should construct. Every
//! argument and return value travels as a [`wire::WireValue`].

pub mod envelope;
pub mod frame;
pub mod identity;

pub use envelope::{CallEnvelope, CallFault, CallId, ReplyEnvelope, ReplyPayload};
pub use frame::{Frame, FrameError, TransferList, MAX_FRAME_BYTES};
pub use identity::ActorName;
