//! Structured Value Codec
//!
//! Converts typed application values to and from a transport-neutral
//! structured representation. The structured form is the only thing that
//! ever crosses a process boundary: callers encode arguments into
//! [`WireValue`]s, the receiving side decodes them back into typed values.
//!
//! # Supported shapes
//!
//! - **Primitives**: null, boolean, double-precision number, text
//! - **Sequences**: ordered lists, plus packed representations for
//!   fully homogeneous numeric arrays ([`WireValue::F64Array`],
//!   [`WireValue::I64Array`])
//! - **Composites**: string-keyed records in field-declaration order
//! - **Opaque**: raw byte buffers that are already transport-native
//!
//! # Fast paths
//!
//! [`to_wire`] special-cases values that are already structured (identity
//! pass-through) and homogeneous numeric vectors (packed arrays) before
//! falling back to field-by-field encoding. Generic per-element encoding
//! is measurably more expensive for bulk numeric data; see
//! `benches/pack_fastpath.rs`.
//!
//! # Examples
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use wire::{from_wire, to_wire, WireValue};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Point { x: f64, y: f64 }
//!
//! let encoded = to_wire(&Point { x: 1.0, y: 2.0 }).unwrap();
//! let decoded: Point = from_wire(encoded).unwrap();
//! assert_eq!(decoded, Point { x: 1.0, y: 2.0 });
//!
//! // Homogeneous numeric vectors take the packed path
//! let packed = to_wire(&vec![1.0f64, 2.0, 3.0]).unwrap();
//! assert!(matches!(packed, WireValue::F64Array(_)));
//! ```

pub mod de;
pub mod error;
pub mod ser;
pub mod value;

pub use de::from_wire;
pub use error::CodecError;
pub use ser::to_wire;
pub use value::WireValue;
