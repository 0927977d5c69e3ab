//! Decoding structured values back into typed values
//!
//! [`from_wire`] drives a serde `Deserialize` implementation over a
//! [`WireValue`]. Shape mismatches surface as [`CodecError`]s instead of
//! panics: a malformed argument is a recoverable protocol condition, not
//! a crash.

use crate::error::CodecError;
use crate::value::WireValue;
use serde::de::{self, DeserializeOwned, Deserializer, IntoDeserializer, Visitor};

/// Decode a structured value into a typed value.
pub fn from_wire<T: DeserializeOwned>(value: WireValue) -> Result<T, CodecError> {
    T::deserialize(ValueDeserializer { value })
}

/// Scalar numbers travel as doubles; only integers inside the exactly
/// representable window can be recovered losslessly.
const EXACT_INT_WINDOW: f64 = 9_007_199_254_740_992.0; // 2^53

fn integer_from_number(n: f64, target: &'static str) -> Result<i64, CodecError> {
    if n.fract() == 0.0 && n.abs() <= EXACT_INT_WINDOW {
        Ok(n as i64)
    } else {
        Err(CodecError::NumberOutOfRange { value: n, target })
    }
}

struct ValueDeserializer {
    value: WireValue,
}

impl ValueDeserializer {
    fn wrong_kind(&self, expected: &'static str) -> CodecError {
        CodecError::WrongKind {
            expected,
            found: self.value.kind(),
        }
    }
}

macro_rules! deserialize_signed {
    ($method:ident, $visit:ident, $ty:ty, $name:literal) => {
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
            match self.value {
                WireValue::Number(n) => {
                    let wide = integer_from_number(n, $name)?;
                    let narrow = <$ty>::try_from(wide).map_err(|_| {
                        CodecError::NumberOutOfRange { value: n, target: $name }
                    })?;
                    visitor.$visit(narrow)
                }
                _ => Err(self.wrong_kind("number")),
            }
        }
    };
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = CodecError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.value {
            WireValue::Null => visitor.visit_unit(),
            WireValue::Bool(b) => visitor.visit_bool(b),
            WireValue::Number(n) => visitor.visit_f64(n),
            WireValue::Text(s) => visitor.visit_string(s),
            WireValue::List(items) => visitor.visit_seq(ListAccess::new(items)),
            WireValue::Record(entries) => visitor.visit_map(RecordAccess::new(entries)),
            WireValue::F64Array(xs) => {
                visitor.visit_seq(ListAccess::new(xs.into_iter().map(WireValue::Number).collect()))
            }
            WireValue::I64Array(xs) => visitor.visit_seq(I64Access { iter: xs.into_iter() }),
            WireValue::Bytes(b) => visitor.visit_byte_buf(b.to_vec()),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.value {
            WireValue::Bool(b) => visitor.visit_bool(b),
            _ => Err(self.wrong_kind("bool")),
        }
    }

    deserialize_signed!(deserialize_i8, visit_i8, i8, "i8");
    deserialize_signed!(deserialize_i16, visit_i16, i16, "i16");
    deserialize_signed!(deserialize_i32, visit_i32, i32, "i32");
    deserialize_signed!(deserialize_u8, visit_u8, u8, "u8");
    deserialize_signed!(deserialize_u16, visit_u16, u16, "u16");
    deserialize_signed!(deserialize_u32, visit_u32, u32, "u32");
    deserialize_signed!(deserialize_u64, visit_u64, u64, "u64");

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.value {
            WireValue::Number(n) => visitor.visit_i64(integer_from_number(n, "i64")?),
            _ => Err(self.wrong_kind("number")),
        }
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        self.deserialize_f64(visitor)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.value {
            WireValue::Number(n) => visitor.visit_f64(n),
            _ => Err(self.wrong_kind("number")),
        }
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.value {
            WireValue::Text(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => visitor.visit_char(c),
                    _ => Err(CodecError::WrongKind {
                        expected: "single-character text",
                        found: "text",
                    }),
                }
            }
            _ => Err(self.wrong_kind("text")),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.value {
            WireValue::Text(s) => visitor.visit_string(s),
            _ => Err(self.wrong_kind("text")),
        }
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        self.deserialize_byte_buf(visitor)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.value {
            WireValue::Bytes(b) => visitor.visit_byte_buf(b.to_vec()),
            _ => Err(self.wrong_kind("bytes")),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.value {
            WireValue::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.value {
            WireValue::Null => visitor.visit_unit(),
            _ => Err(self.wrong_kind("null")),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.value {
            WireValue::List(items) => visitor.visit_seq(ListAccess::new(items)),
            WireValue::F64Array(xs) => {
                visitor.visit_seq(ListAccess::new(xs.into_iter().map(WireValue::Number).collect()))
            }
            WireValue::I64Array(xs) => visitor.visit_seq(I64Access { iter: xs.into_iter() }),
            WireValue::Bytes(b) => visitor.visit_seq(ListAccess::new(
                b.iter().map(|&x| WireValue::Number(f64::from(x))).collect(),
            )),
            _ => Err(self.wrong_kind("list")),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.value {
            WireValue::Record(entries) => visitor.visit_map(RecordAccess::new(entries)),
            _ => Err(self.wrong_kind("record")),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        match self.value {
            WireValue::Text(variant) => visitor.visit_enum(EnumAccess {
                variant,
                value: None,
            }),
            WireValue::Record(mut entries) => {
                if entries.len() != 1 {
                    return Err(CodecError::WrongKind {
                        expected: "single-entry record",
                        found: "record",
                    });
                }
                let (variant, value) = entries.remove(0);
                visitor.visit_enum(EnumAccess {
                    variant,
                    value: Some(value),
                })
            }
            _ => Err(self.wrong_kind("text or record")),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        self.deserialize_string(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        visitor.visit_unit()
    }
}

struct ListAccess {
    iter: std::vec::IntoIter<WireValue>,
}

impl ListAccess {
    fn new(items: Vec<WireValue>) -> Self {
        Self {
            iter: items.into_iter(),
        }
    }
}

impl<'de> de::SeqAccess<'de> for ListAccess {
    type Error = CodecError;

    fn next_element_seed<T: de::DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, CodecError> {
        match self.iter.next() {
            Some(value) => seed.deserialize(ValueDeserializer { value }).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

/// Packed integer arrays hand out exact i64 elements instead of doubles
struct I64Access {
    iter: std::vec::IntoIter<i64>,
}

impl<'de> de::SeqAccess<'de> for I64Access {
    type Error = CodecError;

    fn next_element_seed<T: de::DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, CodecError> {
        match self.iter.next() {
            Some(x) => seed.deserialize(x.into_deserializer()).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct RecordAccess {
    entries: std::vec::IntoIter<(String, WireValue)>,
    pending: Option<WireValue>,
}

impl RecordAccess {
    fn new(entries: Vec<(String, WireValue)>) -> Self {
        Self {
            entries: entries.into_iter(),
            pending: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for RecordAccess {
    type Error = CodecError;

    fn next_key_seed<K: de::DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, CodecError> {
        match self.entries.next() {
            Some((key, value)) => {
                self.pending = Some(value);
                seed.deserialize(key.into_deserializer()).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: de::DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, CodecError> {
        let value = self
            .pending
            .take()
            .expect("next_value_seed called before next_key_seed");
        seed.deserialize(ValueDeserializer { value })
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

struct EnumAccess {
    variant: String,
    value: Option<WireValue>,
}

impl<'de> de::EnumAccess<'de> for EnumAccess {
    type Error = CodecError;
    type Variant = VariantAccess;

    fn variant_seed<V: de::DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, VariantAccess), CodecError> {
        let tag = seed.deserialize(self.variant.into_deserializer())?;
        Ok((tag, VariantAccess { value: self.value }))
    }
}

struct VariantAccess {
    value: Option<WireValue>,
}

impl<'de> de::VariantAccess<'de> for VariantAccess {
    type Error = CodecError;

    fn unit_variant(self) -> Result<(), CodecError> {
        match self.value {
            None => Ok(()),
            Some(value) => Err(CodecError::WrongKind {
                expected: "unit variant",
                found: value.kind(),
            }),
        }
    }

    fn newtype_variant_seed<T: de::DeserializeSeed<'de>>(
        self,
        seed: T,
    ) -> Result<T::Value, CodecError> {
        match self.value {
            Some(value) => seed.deserialize(ValueDeserializer { value }),
            None => Err(CodecError::WrongKind {
                expected: "variant payload",
                found: "null",
            }),
        }
    }

    fn tuple_variant<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        match self.value {
            Some(value) => ValueDeserializer { value }.deserialize_seq(visitor),
            None => Err(CodecError::WrongKind {
                expected: "variant payload",
                found: "null",
            }),
        }
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        match self.value {
            Some(value) => ValueDeserializer { value }.deserialize_map(visitor),
            None => Err(CodecError::WrongKind {
                expected: "variant payload",
                found: "null",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ser::to_wire;
    use serde::{Deserialize, Serialize};

    #[test]
    fn scalar_kinds_decode() {
        assert_eq!(from_wire::<f64>(WireValue::Number(2.5)).unwrap(), 2.5);
        assert_eq!(from_wire::<bool>(WireValue::Bool(true)).unwrap(), true);
        assert_eq!(
            from_wire::<String>(WireValue::Text("hi".to_string())).unwrap(),
            "hi"
        );
        assert_eq!(from_wire::<()>(WireValue::Null).unwrap(), ());
    }

    #[test]
    fn integers_decode_through_the_double_window() {
        assert_eq!(from_wire::<i64>(WireValue::Number(-42.0)).unwrap(), -42);
        assert_eq!(from_wire::<u8>(WireValue::Number(200.0)).unwrap(), 200);

        let err = from_wire::<u8>(WireValue::Number(300.0)).unwrap_err();
        assert!(matches!(err, CodecError::NumberOutOfRange { .. }));

        let err = from_wire::<i64>(WireValue::Number(1.5)).unwrap_err();
        assert!(matches!(err, CodecError::NumberOutOfRange { .. }));
    }

    #[test]
    fn packed_i64_array_keeps_full_precision() {
        let big = i64::MAX - 1;
        let decoded: Vec<i64> = from_wire(WireValue::I64Array(vec![big, 3])).unwrap();
        assert_eq!(decoded, vec![big, 3]);
    }

    #[test]
    fn wrong_kind_is_reported_with_both_shapes() {
        let err = from_wire::<f64>(WireValue::Text("nope".to_string())).unwrap_err();
        assert_eq!(
            err,
            CodecError::WrongKind {
                expected: "number",
                found: "text"
            }
        );
    }

    #[test]
    fn missing_struct_field_is_a_decode_error() {
        #[derive(Deserialize, Debug)]
        #[allow(dead_code)]
        struct Pair {
            left: f64,
            right: f64,
        }

        let partial = WireValue::Record(vec![("left".to_string(), WireValue::Number(1.0))]);
        let err = from_wire::<Pair>(partial).unwrap_err();
        assert!(matches!(err, CodecError::Message(_)));
    }

    #[test]
    fn options_round_trip() {
        assert_eq!(from_wire::<Option<f64>>(WireValue::Null).unwrap(), None);
        assert_eq!(
            from_wire::<Option<f64>>(WireValue::Number(7.0)).unwrap(),
            Some(7.0)
        );
    }

    #[test]
    fn enums_round_trip_in_both_shapes() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        enum Status {
            Idle,
            Busy { queue_depth: u32 },
        }

        let unit = to_wire(&Status::Idle).unwrap();
        assert_eq!(unit, WireValue::Text("Idle".to_string()));
        assert_eq!(from_wire::<Status>(unit).unwrap(), Status::Idle);

        let payload = to_wire(&Status::Busy { queue_depth: 3 }).unwrap();
        assert_eq!(
            from_wire::<Status>(payload).unwrap(),
            Status::Busy { queue_depth: 3 }
        );
    }

    #[test]
    fn vec_u8_survives_the_generic_path() {
        let encoded = to_wire(&vec![1u8, 2, 255]).unwrap();
        let decoded: Vec<u8> = from_wire(encoded).unwrap();
        assert_eq!(decoded, vec![1, 2, 255]);
    }
}
