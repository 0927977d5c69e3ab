//! The tagged frame union and its codecs
//!
//! Every message that crosses a process boundary is one [`Frame`]:
//!
//! | Tag | Payload |
//! |---|---|
//! | `processReady` | none |
//! | `initialize` | actor identity |
//! | `remoteCall` | call envelope |
//! | `reply` | reply envelope |
//!
//! Two renderings are provided: a length-prefixed binary form for byte
//! channels (child-process pipes) and a JSON form for debugging and
//! interop. A malformed frame is a recoverable error; consumers drop it,
//! report it, and keep processing.

use crate::envelope::{CallEnvelope, ReplyEnvelope};
use crate::identity::ActorName;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Buffers to hand over alongside a frame rather than copy.
///
/// In-process ports move the refcounted buffers directly; byte channels
/// serialize frame contents regardless, so for them the list is only a
/// hint.
pub type TransferList = Vec<Bytes>;

/// Upper bound on one encoded frame body
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Byte width of the length prefix on binary frames
pub const LENGTH_PREFIX: usize = 4;

/// One message on the process boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Frame {
    /// A worker announces, exactly once, that it can receive messages
    #[serde(rename = "processReady")]
    ProcessReady,
    /// Tells a fresh worker which actor it hosts
    #[serde(rename = "initialize")]
    Initialize(ActorName),
    /// Remote method invocation
    #[serde(rename = "remoteCall")]
    RemoteCall(CallEnvelope),
    /// Outcome of a remote invocation
    #[serde(rename = "reply")]
    Reply(ReplyEnvelope),
}

impl Frame {
    /// Wire tag for diagnostics
    pub fn tag(&self) -> &'static str {
        match self {
            Frame::ProcessReady => "processReady",
            Frame::Initialize(_) => "initialize",
            Frame::RemoteCall(_) => "remoteCall",
            Frame::Reply(_) => "reply",
        }
    }
}

/// Frame encode/decode failures
#[derive(Debug, Error)]
pub enum FrameError {
    /// Buffer ends before the declared frame does
    #[error("truncated frame: need {need} bytes, got {got}")]
    Truncated { need: usize, got: usize },

    /// Encoded body exceeds [`MAX_FRAME_BYTES`]
    #[error("frame too large: {size} bytes exceeds maximum {max}")]
    TooLarge { size: usize, max: usize },

    /// Body bytes do not decode as any known frame shape
    #[error("malformed frame: {0}")]
    Malformed(String),
}

/// Encode a frame as `[len: u32 LE][bincode body]`.
pub fn to_bytes(frame: &Frame) -> Result<Vec<u8>, FrameError> {
    let body = encode_body(frame)?;
    let mut buf = Vec::with_capacity(LENGTH_PREFIX + body.len());
    buf.extend_from_slice(&(body.len() as u32).to_le_bytes());
    buf.extend_from_slice(&body);
    Ok(buf)
}

/// Encode just the frame body, without the length prefix.
pub fn encode_body(frame: &Frame) -> Result<Vec<u8>, FrameError> {
    let body = bincode::serialize(frame).map_err(|e| FrameError::Malformed(e.to_string()))?;
    if body.len() > MAX_FRAME_BYTES {
        return Err(FrameError::TooLarge {
            size: body.len(),
            max: MAX_FRAME_BYTES,
        });
    }
    Ok(body)
}

/// Decode a frame body that has already been separated from its prefix.
pub fn decode_body(body: &[u8]) -> Result<Frame, FrameError> {
    bincode::deserialize(body).map_err(|e| FrameError::Malformed(e.to_string()))
}

/// Parse one length-prefixed frame from the front of `buf`, returning the
/// frame and the number of bytes consumed.
pub fn from_bytes(buf: &[u8]) -> Result<(Frame, usize), FrameError> {
    if buf.len() < LENGTH_PREFIX {
        return Err(FrameError::Truncated {
            need: LENGTH_PREFIX,
            got: buf.len(),
        });
    }

    let len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(FrameError::TooLarge {
            size: len,
            max: MAX_FRAME_BYTES,
        });
    }

    let total = LENGTH_PREFIX + len;
    if buf.len() < total {
        return Err(FrameError::Truncated {
            need: total,
            got: buf.len(),
        });
    }

    let frame = decode_body(&buf[LENGTH_PREFIX..total])?;
    Ok((frame, total))
}

/// Render a frame as JSON, tags matching the wire names.
pub fn to_json(frame: &Frame) -> Result<String, FrameError> {
    serde_json::to_string(frame).map_err(|e| FrameError::Malformed(e.to_string()))
}

/// Parse a frame from its JSON rendering.
pub fn from_json(text: &str) -> Result<Frame, FrameError> {
    serde_json::from_str(text).map_err(|e| FrameError::Malformed(e.to_string()))
}
