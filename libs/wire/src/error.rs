//! Codec errors with diagnostic context
//!
//! Every decode failure names the shape that was expected and the shape
//! that was found, so a mismatched argument can be traced back to the
//! offending value without a debugger.

use std::fmt;
use thiserror::Error;

/// Structured value encode/decode errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    /// Structured shape does not match the target type's expected shape
    #[error("wrong value kind: expected {expected}, found {found}")]
    WrongKind {
        expected: &'static str,
        found: &'static str,
    },

    /// Number cannot be represented in the requested integer type.
    /// Integers are carried as double-precision numbers, so only values
    /// within +/- 2^53 survive the trip exactly; packed arrays keep full
    /// integer precision.
    #[error("number {value} does not fit {target}")]
    NumberOutOfRange { value: f64, target: &'static str },

    /// Maps must be string-keyed to stay transport-safe
    #[error("record keys must be text, found {found}")]
    KeyMustBeText { found: &'static str },

    /// Positional argument list ran out before the target type was satisfied
    #[error("argument list exhausted while decoding {expected}")]
    ArgumentsExhausted { expected: &'static str },

    /// Value kind the codec does not carry (e.g. 128-bit integers)
    #[error("unsupported value: {0}")]
    Unsupported(&'static str),

    /// Error raised by a serde implementation (missing field, unknown
    /// variant, custom validation)
    #[error("{0}")]
    Message(String),
}

impl serde::ser::Error for CodecError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        CodecError::Message(msg.to_string())
    }
}

impl serde::de::Error for CodecError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        CodecError::Message(msg.to_string())
    }
}
