//! Encoding typed values into structured form
//!
//! [`to_wire`] checks a handful of fast paths before handing the value to
//! the field-by-field serializer:
//!
//! - a value that is already a [`WireValue`] passes through unchanged
//! - homogeneous numeric vectors become packed arrays instead of
//!   per-element lists
//! - raw byte buffers become the opaque bytes kind
//!
//! Without these, bulk numeric data would be encoded one element at a
//! time, which is orders of magnitude slower.

use crate::error::CodecError;
use crate::value::WireValue;
use bytes::Bytes;
use serde::ser::{self, Serialize};
use std::any::Any;

/// Encode a typed value into its structured representation.
///
/// Values must be `'static` so the packed-array and identity fast paths
/// can inspect the concrete type at runtime; borrow owned data when
/// encoding arguments.
pub fn to_wire<T: Serialize + 'static>(value: &T) -> Result<WireValue, CodecError> {
    let any: &dyn Any = value;

    // Identity pass-through: already in structured form.
    if let Some(v) = any.downcast_ref::<WireValue>() {
        return Ok(v.clone());
    }

    // Packed representations for fully homogeneous numeric sequences.
    if let Some(v) = any.downcast_ref::<Vec<f64>>() {
        return Ok(WireValue::F64Array(v.clone()));
    }
    if let Some(v) = any.downcast_ref::<Vec<f32>>() {
        return Ok(WireValue::F64Array(v.iter().map(|&x| f64::from(x)).collect()));
    }
    if let Some(v) = any.downcast_ref::<Vec<i64>>() {
        return Ok(WireValue::I64Array(v.clone()));
    }
    if let Some(v) = any.downcast_ref::<Vec<u64>>() {
        if let Ok(packed) = v.iter().map(|&x| i64::try_from(x)).collect::<Result<Vec<i64>, _>>() {
            return Ok(WireValue::I64Array(packed));
        }
        // Values beyond i64 fall through to the generic (lossy) path,
        // same as scalar u64.
    }

    // Transport-native buffers.
    if let Some(v) = any.downcast_ref::<Bytes>() {
        return Ok(WireValue::Bytes(v.clone()));
    }

    value.serialize(ValueSerializer)
}

/// Serializer producing [`WireValue`]s
pub struct ValueSerializer;

/// Pack a finished sequence when every element turned out numeric
fn finish_seq(items: Vec<WireValue>) -> WireValue {
    if !items.is_empty() && items.iter().all(|v| matches!(v, WireValue::Number(_))) {
        let packed = items
            .iter()
            .map(|v| match v {
                WireValue::Number(n) => *n,
                _ => unreachable!(),
            })
            .collect();
        return WireValue::F64Array(packed);
    }
    WireValue::List(items)
}

impl ser::Serializer for ValueSerializer {
    type Ok = WireValue;
    type Error = CodecError;

    type SerializeSeq = SeqSerializer;
    type SerializeTuple = SeqSerializer;
    type SerializeTupleStruct = SeqSerializer;
    type SerializeTupleVariant = VariantSeqSerializer;
    type SerializeMap = MapSerializer;
    type SerializeStruct = MapSerializer;
    type SerializeStructVariant = VariantMapSerializer;

    fn serialize_bool(self, v: bool) -> Result<WireValue, CodecError> {
        Ok(WireValue::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<WireValue, CodecError> {
        Ok(WireValue::Number(f64::from(v)))
    }

    fn serialize_i16(self, v: i16) -> Result<WireValue, CodecError> {
        Ok(WireValue::Number(f64::from(v)))
    }

    fn serialize_i32(self, v: i32) -> Result<WireValue, CodecError> {
        Ok(WireValue::Number(f64::from(v)))
    }

    fn serialize_i64(self, v: i64) -> Result<WireValue, CodecError> {
        Ok(WireValue::Number(v as f64))
    }

    fn serialize_u8(self, v: u8) -> Result<WireValue, CodecError> {
        Ok(WireValue::Number(f64::from(v)))
    }

    fn serialize_u16(self, v: u16) -> Result<WireValue, CodecError> {
        Ok(WireValue::Number(f64::from(v)))
    }

    fn serialize_u32(self, v: u32) -> Result<WireValue, CodecError> {
        Ok(WireValue::Number(f64::from(v)))
    }

    fn serialize_u64(self, v: u64) -> Result<WireValue, CodecError> {
        Ok(WireValue::Number(v as f64))
    }

    fn serialize_f32(self, v: f32) -> Result<WireValue, CodecError> {
        Ok(WireValue::Number(f64::from(v)))
    }

    fn serialize_f64(self, v: f64) -> Result<WireValue, CodecError> {
        Ok(WireValue::Number(v))
    }

    fn serialize_char(self, v: char) -> Result<WireValue, CodecError> {
        Ok(WireValue::Text(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<WireValue, CodecError> {
        Ok(WireValue::Text(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<WireValue, CodecError> {
        Ok(WireValue::Bytes(Bytes::copy_from_slice(v)))
    }

    fn serialize_none(self) -> Result<WireValue, CodecError> {
        Ok(WireValue::Null)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<WireValue, CodecError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<WireValue, CodecError> {
        Ok(WireValue::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<WireValue, CodecError> {
        Ok(WireValue::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<WireValue, CodecError> {
        Ok(WireValue::Text(variant.to_string()))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<WireValue, CodecError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<WireValue, CodecError> {
        let inner = value.serialize(ValueSerializer)?;
        Ok(WireValue::Record(vec![(variant.to_string(), inner)]))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqSerializer, CodecError> {
        Ok(SeqSerializer {
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqSerializer, CodecError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SeqSerializer, CodecError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantSeqSerializer, CodecError> {
        Ok(VariantSeqSerializer {
            variant,
            items: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<MapSerializer, CodecError> {
        Ok(MapSerializer {
            entries: Vec::with_capacity(len.unwrap_or(0)),
            pending_key: None,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<MapSerializer, CodecError> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantMapSerializer, CodecError> {
        Ok(VariantMapSerializer {
            variant,
            entries: Vec::with_capacity(len),
        })
    }
}

pub struct SeqSerializer {
    items: Vec<WireValue>,
}

impl ser::SerializeSeq for SeqSerializer {
    type Ok = WireValue;
    type Error = CodecError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CodecError> {
        self.items.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<WireValue, CodecError> {
        Ok(finish_seq(self.items))
    }
}

impl ser::SerializeTuple for SeqSerializer {
    type Ok = WireValue;
    type Error = CodecError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CodecError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<WireValue, CodecError> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SeqSerializer {
    type Ok = WireValue;
    type Error = CodecError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CodecError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<WireValue, CodecError> {
        ser::SerializeSeq::end(self)
    }
}

pub struct VariantSeqSerializer {
    variant: &'static str,
    items: Vec<WireValue>,
}

impl ser::SerializeTupleVariant for VariantSeqSerializer {
    type Ok = WireValue;
    type Error = CodecError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CodecError> {
        self.items.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<WireValue, CodecError> {
        Ok(WireValue::Record(vec![(
            self.variant.to_string(),
            finish_seq(self.items),
        )]))
    }
}

pub struct MapSerializer {
    entries: Vec<(String, WireValue)>,
    pending_key: Option<String>,
}

impl ser::SerializeMap for MapSerializer {
    type Ok = WireValue;
    type Error = CodecError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), CodecError> {
        match key.serialize(ValueSerializer)? {
            WireValue::Text(s) => {
                self.pending_key = Some(s);
                Ok(())
            }
            other => Err(CodecError::KeyMustBeText { found: other.kind() }),
        }
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CodecError> {
        let key = self
            .pending_key
            .take()
            .expect("serialize_value called before serialize_key");
        self.entries.push((key, value.serialize(ValueSerializer)?));
        Ok(())
    }

    fn end(self) -> Result<WireValue, CodecError> {
        Ok(WireValue::Record(self.entries))
    }
}

impl ser::SerializeStruct for MapSerializer {
    type Ok = WireValue;
    type Error = CodecError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), CodecError> {
        self.entries
            .push((key.to_string(), value.serialize(ValueSerializer)?));
        Ok(())
    }

    fn end(self) -> Result<WireValue, CodecError> {
        Ok(WireValue::Record(self.entries))
    }
}

pub struct VariantMapSerializer {
    variant: &'static str,
    entries: Vec<(String, WireValue)>,
}

impl ser::SerializeStructVariant for VariantMapSerializer {
    type Ok = WireValue;
    type Error = CodecError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), CodecError> {
        self.entries
            .push((key.to_string(), value.serialize(ValueSerializer)?));
        Ok(())
    }

    fn end(self) -> Result<WireValue, CodecError> {
        Ok(WireValue::Record(vec![(
            self.variant.to_string(),
            WireValue::Record(self.entries),
        )]))
    }
}
