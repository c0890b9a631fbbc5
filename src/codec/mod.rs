//! # RowBinary Codecs
//!
//! Every [`Type`] can read one value from a RowBinary byte slice and write
//! one value to a [`BytesMut`]. Dispatch is a single exhaustive match over
//! the type tree, so adding a [`Type`] variant fails to compile until it has
//! a codec.
//!
//! ## Wire Format
//!
//! - Fixed-width numbers are little-endian
//! - String lengths, array sizes and map sizes are LEB128 varints
//! - `Nullable(T)` is a flag byte (`1` = NULL) followed by `T` when not NULL
//! - `LowCardinality(T)` and `SimpleAggregateFunction(f, T)` are written as `T`
//!
//! ## Atomicity
//!
//! [`Type::encode`] either appends the whole value or leaves the buffer as it
//! found it. Decoding advances the slice past the value it read; on error the
//! slice position is unspecified.

pub(crate) mod composite;
pub(crate) mod date;
pub(crate) mod decimal;
pub(crate) mod dynamic;
pub(crate) mod enums;
pub(crate) mod network;
pub(crate) mod numeric;
pub(crate) mod string;

use crate::{
    types::{
        Type,
        TypeCode,
    },
    Error,
    Result,
    Value,
};
use bytes::BytesMut;
use chrono_tz::Tz;
use tracing::trace;

impl Type {
    /// Read one value of this type from the front of `buffer`.
    ///
    /// # Example
    ///
    /// ```
    /// use clickhouse_type_codec::{Type, Value};
    ///
    /// let ty = Type::parse("Nullable(UInt16)").unwrap();
    /// let mut bytes: &[u8] = &[0x00, 0x2A, 0x00];
    /// assert_eq!(ty.decode(&mut bytes).unwrap(), Value::UInt16(42));
    /// assert!(bytes.is_empty());
    /// ```
    pub fn decode(&self, buffer: &mut &[u8]) -> Result<Value> {
        decode_value(self, buffer, 0)
    }

    /// Append the RowBinary encoding of `value` to `buffer`.
    ///
    /// On error nothing is appended.
    pub fn encode(&self, buffer: &mut BytesMut, value: &Value) -> Result<()> {
        let start = buffer.len();
        let result = encode_value(self, buffer, value);
        if let Err(ref e) = result {
            trace!(type_name = %self, error = %e, "encode failed, rolling back");
            buffer.truncate(start);
        }
        result
    }

    /// Convenience wrapper returning the encoded bytes.
    pub fn encode_to_vec(&self, value: &Value) -> Result<Vec<u8>> {
        let mut buffer = BytesMut::new();
        self.encode(&mut buffer, value)?;
        Ok(buffer.to_vec())
    }
}

fn unsupported(ty: &Type, value: &Value) -> Error {
    Error::UnsupportedConversion(format!("Cannot convert {} to {}", value.kind(), ty))
}

fn geo(code: TypeCode) -> Result<Type> {
    Type::geo_layout(code)
        .ok_or_else(|| Error::UnknownType(format!("{} has no geo layout", code.name())))
}

/// `nesting` counts the Dynamic and JSON values enclosing this one; each
/// carries its own type, so the type tree alone does not bound recursion.
pub(crate) fn decode_value(ty: &Type, buffer: &mut &[u8], nesting: usize) -> Result<Value> {
    match ty {
        Type::Simple(code) => decode_simple(*code, buffer, nesting),
        Type::FixedString { size } => string::decode_fixed_string(*size, buffer),
        Type::DateTime { timezone } => date::decode_datetime(buffer, timezone.tz()),
        Type::DateTime64 { precision, timezone } => {
            date::decode_datetime64(buffer, *precision, timezone.tz())
        }
        Type::Decimal { precision, scale, use_big_decimal } => {
            decimal::decode_decimal(*precision, *scale, *use_big_decimal, buffer)
        }
        Type::Enum8 { items } => enums::decode_enum8(items, buffer),
        Type::Enum16 { items } => enums::decode_enum16(items, buffer),
        Type::Array { item_type } => composite::decode_array(item_type, buffer, nesting),
        Type::Nullable { nested_type } => composite::decode_nullable(nested_type, buffer, nesting),
        Type::Tuple { item_types, .. } => composite::decode_tuple(item_types, buffer, nesting),
        Type::Nested { fields } => composite::decode_nested(fields, buffer, nesting),
        Type::LowCardinality { nested_type }
        | Type::SimpleAggregateFunction { nested_type, .. } => {
            decode_value(nested_type, buffer, nesting)
        }
        Type::Map { key_type, value_type } => {
            composite::decode_map(key_type, value_type, buffer, nesting)
        }
        Type::Variant { variants } => composite::decode_variant(variants, buffer, nesting),
    }
}

fn decode_simple(code: TypeCode, buffer: &mut &[u8], nesting: usize) -> Result<Value> {
    match code {
        TypeCode::Nothing => Ok(Value::Null),
        TypeCode::Bool => numeric::decode_bool(buffer),
        TypeCode::Int8
        | TypeCode::Int16
        | TypeCode::Int32
        | TypeCode::Int64
        | TypeCode::Int128
        | TypeCode::Int256
        | TypeCode::UInt8
        | TypeCode::UInt16
        | TypeCode::UInt32
        | TypeCode::UInt64
        | TypeCode::UInt128
        | TypeCode::UInt256 => numeric::decode_integer(code, buffer),
        TypeCode::Float32 | TypeCode::Float64 => numeric::decode_float(code, buffer),
        TypeCode::String => string::decode_string(buffer),
        TypeCode::Date => date::decode_date(buffer),
        TypeCode::Date32 => date::decode_date32(buffer),
        TypeCode::UUID => network::decode_uuid(buffer),
        TypeCode::IPv4 => network::decode_ipv4(buffer),
        TypeCode::IPv6 => network::decode_ipv6(buffer),
        TypeCode::Dynamic => dynamic::decode_dynamic(buffer, nesting),
        TypeCode::Json | TypeCode::Object => dynamic::decode_json(buffer, nesting),
        TypeCode::Point | TypeCode::Ring | TypeCode::Polygon | TypeCode::MultiPolygon => {
            decode_value(&geo(code)?, buffer, nesting)
        }
        TypeCode::FixedString
        | TypeCode::DateTime
        | TypeCode::DateTime64
        | TypeCode::Decimal
        | TypeCode::Enum8
        | TypeCode::Enum16
        | TypeCode::Array
        | TypeCode::Nullable
        | TypeCode::Tuple
        | TypeCode::Nested
        | TypeCode::LowCardinality
        | TypeCode::Map
        | TypeCode::Variant
        | TypeCode::SimpleAggregateFunction => Err(Error::UnknownType(format!(
            "{} requires parameters",
            code.name()
        ))),
    }
}

/// Encode without rollback; callers above [`Type::encode`] rely on the
/// outermost call truncating.
pub(crate) fn encode_value(ty: &Type, buffer: &mut BytesMut, value: &Value) -> Result<()> {
    match ty {
        Type::Simple(code) => encode_simple(ty, *code, buffer, value),
        Type::FixedString { size } => string::encode_fixed_string(*size, buffer, value),
        Type::DateTime { timezone } => date::encode_datetime(buffer, value, timezone.tz()),
        Type::DateTime64 { precision, timezone } => {
            date::encode_datetime64(buffer, value, *precision, timezone.tz())
        }
        Type::Decimal { precision, scale, .. } => {
            decimal::encode_decimal(*precision, *scale, buffer, value)
        }
        Type::Enum8 { items } => enums::encode_enum8(items, buffer, value),
        Type::Enum16 { items } => enums::encode_enum16(items, buffer, value),
        Type::Array { item_type } => composite::encode_array(ty, item_type, buffer, value),
        Type::Nullable { nested_type } => {
            composite::encode_nullable(nested_type, buffer, value)
        }
        Type::Tuple { item_types, item_names } => composite::encode_tuple(
            ty,
            item_types,
            item_names.as_deref(),
            buffer,
            value,
        ),
        Type::Nested { fields } => composite::encode_nested(ty, fields, buffer, value),
        Type::LowCardinality { nested_type }
        | Type::SimpleAggregateFunction { nested_type, .. } => {
            encode_value(nested_type, buffer, value)
        }
        Type::Map { key_type, value_type } => {
            composite::encode_map(ty, key_type, value_type, buffer, value)
        }
        Type::Variant { variants } => composite::encode_variant(variants, buffer, value),
    }
}

fn encode_simple(ty: &Type, code: TypeCode, buffer: &mut BytesMut, value: &Value) -> Result<()> {
    match code {
        TypeCode::Nothing if value.is_null() => Ok(()),
        TypeCode::Nothing => Err(unsupported(ty, value)),
        TypeCode::Bool => numeric::encode_bool(buffer, value),
        TypeCode::Int8
        | TypeCode::Int16
        | TypeCode::Int32
        | TypeCode::Int64
        | TypeCode::Int128
        | TypeCode::Int256
        | TypeCode::UInt8
        | TypeCode::UInt16
        | TypeCode::UInt32
        | TypeCode::UInt64
        | TypeCode::UInt128
        | TypeCode::UInt256 => numeric::encode_integer(code, buffer, value),
        TypeCode::Float32 | TypeCode::Float64 => numeric::encode_float(code, buffer, value),
        TypeCode::String => string::encode_string(buffer, value),
        TypeCode::Date => date::encode_date(buffer, value, Tz::UTC),
        TypeCode::Date32 => date::encode_date32(buffer, value, Tz::UTC),
        TypeCode::UUID => network::encode_uuid(buffer, value),
        TypeCode::IPv4 => network::encode_ipv4(buffer, value),
        TypeCode::IPv6 => network::encode_ipv6(buffer, value),
        TypeCode::Dynamic => dynamic::encode_dynamic(buffer, value),
        TypeCode::Json | TypeCode::Object => dynamic::encode_json(buffer, value),
        TypeCode::Point | TypeCode::Ring | TypeCode::Polygon | TypeCode::MultiPolygon => {
            encode_value(&geo(code)?, buffer, value)
        }
        TypeCode::FixedString
        | TypeCode::DateTime
        | TypeCode::DateTime64
        | TypeCode::Decimal
        | TypeCode::Enum8
        | TypeCode::Enum16
        | TypeCode::Array
        | TypeCode::Nullable
        | TypeCode::Tuple
        | TypeCode::Nested
        | TypeCode::LowCardinality
        | TypeCode::Map
        | TypeCode::Variant
        | TypeCode::SimpleAggregateFunction => Err(Error::UnknownType(format!(
            "{} requires parameters",
            code.name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_rolls_back_on_error() {
        let ty = Type::tuple(vec![Type::uint8(), Type::uint8()]);
        let mut buffer = BytesMut::from(&[0xAAu8][..]);
        let value = Value::Tuple(vec![Value::Int32(1), Value::Int32(256)]);
        assert!(matches!(ty.encode(&mut buffer, &value), Err(Error::EncodingOverflow { .. })));
        assert_eq!(&buffer[..], &[0xAA]);
    }

    #[test]
    fn test_transparent_wrappers() {
        let plain = Type::string();
        let wrapped = Type::parse("LowCardinality(String)").unwrap();
        let saf = Type::parse("SimpleAggregateFunction(any, String)").unwrap();
        let value = Value::from("abc");
        let expected = plain.encode_to_vec(&value).unwrap();
        assert_eq!(wrapped.encode_to_vec(&value).unwrap(), expected);
        assert_eq!(saf.encode_to_vec(&value).unwrap(), expected);
    }

    #[test]
    fn test_nothing() {
        let ty = Type::nothing();
        assert_eq!(ty.encode_to_vec(&Value::Null).unwrap(), Vec::<u8>::new());
        assert!(ty.encode_to_vec(&Value::Int8(1)).is_err());
        let mut slice: &[u8] = &[1, 2];
        assert_eq!(ty.decode(&mut slice).unwrap(), Value::Null);
        assert_eq!(slice.len(), 2);
    }

    #[test]
    fn test_point_layout() {
        let value = Value::Tuple(vec![Value::Float64(1.5), Value::Float64(-2.0)]);
        let bytes = Type::point().encode_to_vec(&value).unwrap();
        let mut expected = 1.5f64.to_le_bytes().to_vec();
        expected.extend_from_slice(&(-2.0f64).to_le_bytes());
        assert_eq!(bytes, expected);

        let mut slice = &bytes[..];
        assert_eq!(Type::point().decode(&mut slice).unwrap(), value);
    }

    #[test]
    fn test_truncated_input() {
        let mut slice: &[u8] = &[0x05, b'a', b'b'];
        assert!(matches!(Type::string().decode(&mut slice), Err(Error::DecodingFormat(_))));
    }
}
