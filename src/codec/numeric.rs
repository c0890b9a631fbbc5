//! Integer, float and Bool codecs.
//!
//! Encoding converts the supplied value to the column's width when the
//! conversion is lossless and fails with `EncodingOverflow` otherwise.

use crate::{
    io::buffer_utils::read_bytes,
    numeric::{
        Int128,
        Int256,
        UInt128,
        UInt256,
    },
    types::TypeCode,
    Error,
    Result,
    Value,
};
use bytes::{
    BufMut,
    BytesMut,
};
use num_bigint::BigInt;
use num_traits::{
    FromPrimitive,
    ToPrimitive,
    Zero,
};

/// Read exactly `N` bytes.
pub(crate) fn read_array<const N: usize>(buffer: &mut &[u8], what: &str) -> Result<[u8; N]> {
    let bytes = read_bytes(buffer, N, what)?;
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    Ok(out)
}

pub(crate) fn decode_integer(code: TypeCode, buffer: &mut &[u8]) -> Result<Value> {
    let what = code.name();
    Ok(match code {
        TypeCode::Int8 => Value::Int8(i8::from_le_bytes(read_array(buffer, what)?)),
        TypeCode::Int16 => Value::Int16(i16::from_le_bytes(read_array(buffer, what)?)),
        TypeCode::Int32 => Value::Int32(i32::from_le_bytes(read_array(buffer, what)?)),
        TypeCode::Int64 => Value::Int64(i64::from_le_bytes(read_array(buffer, what)?)),
        TypeCode::Int128 => Value::Int128(Int128::from_le_bytes(read_array(buffer, what)?)),
        TypeCode::Int256 => Value::Int256(Int256::from_le_bytes(read_array(buffer, what)?)),
        TypeCode::UInt8 => Value::UInt8(u8::from_le_bytes(read_array(buffer, what)?)),
        TypeCode::UInt16 => Value::UInt16(u16::from_le_bytes(read_array(buffer, what)?)),
        TypeCode::UInt32 => Value::UInt32(u32::from_le_bytes(read_array(buffer, what)?)),
        TypeCode::UInt64 => Value::UInt64(u64::from_le_bytes(read_array(buffer, what)?)),
        TypeCode::UInt128 => {
            Value::UInt128(UInt128::from_le_bytes(read_array(buffer, what)?))
        }
        TypeCode::UInt256 => {
            Value::UInt256(UInt256::from_le_bytes(read_array(buffer, what)?))
        }
        other => {
            return Err(Error::DecodingFormat(format!(
                "{} is not an integer type",
                other.name()
            )))
        }
    })
}

fn exact_integer(code: TypeCode, value: &Value) -> bool {
    matches!(
        (code, value),
        (TypeCode::Int8, Value::Int8(_))
            | (TypeCode::Int16, Value::Int16(_))
            | (TypeCode::Int32, Value::Int32(_))
            | (TypeCode::Int64, Value::Int64(_))
            | (TypeCode::Int128, Value::Int128(_))
            | (TypeCode::Int256, Value::Int256(_))
            | (TypeCode::UInt8, Value::UInt8(_))
            | (TypeCode::UInt16, Value::UInt16(_))
            | (TypeCode::UInt32, Value::UInt32(_))
            | (TypeCode::UInt64, Value::UInt64(_))
            | (TypeCode::UInt128, Value::UInt128(_))
            | (TypeCode::UInt256, Value::UInt256(_))
    )
}

fn bigint_to_integer(code: TypeCode, v: &BigInt) -> Option<Value> {
    Some(match code {
        TypeCode::Int8 => Value::Int8(v.to_i8()?),
        TypeCode::Int16 => Value::Int16(v.to_i16()?),
        TypeCode::Int32 => Value::Int32(v.to_i32()?),
        TypeCode::Int64 => Value::Int64(v.to_i64()?),
        TypeCode::Int128 => Value::Int128(Int128::from_bigint(v).ok()?),
        TypeCode::Int256 => Value::Int256(Int256::from_bigint(v).ok()?),
        TypeCode::UInt8 => Value::UInt8(v.to_u8()?),
        TypeCode::UInt16 => Value::UInt16(v.to_u16()?),
        TypeCode::UInt32 => Value::UInt32(v.to_u32()?),
        TypeCode::UInt64 => Value::UInt64(v.to_u64()?),
        TypeCode::UInt128 => Value::UInt128(UInt128::from_bigint(v).ok()?),
        TypeCode::UInt256 => Value::UInt256(UInt256::from_bigint(v).ok()?),
        _ => return None,
    })
}

fn unsupported(type_name: &str, value: &Value) -> Error {
    Error::UnsupportedConversion(format!("Cannot convert {} to {}", value.kind(), type_name))
}

/// Value as an arbitrary-precision integer, if it holds an integral number.
fn integral_value(type_name: &str, value: &Value) -> Result<BigInt> {
    if let Some(v) = value.as_bigint() {
        return Ok(v);
    }
    match value {
        Value::Bool(b) => Ok(BigInt::from(*b as u8)),
        Value::Float32(_) | Value::Float64(_) => {
            let f = value.as_f64().unwrap_or(f64::NAN);
            if f.is_finite() && f.fract() == 0.0 {
                BigInt::from_f64(f).ok_or_else(|| Error::overflow(type_name, f))
            } else {
                Err(Error::overflow(type_name, f))
            }
        }
        Value::Decimal(d) => {
            let normalized = d.normalize();
            if normalized.scale() == 0 {
                Ok(normalized.mantissa().clone())
            } else {
                Err(Error::overflow(type_name, d))
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<BigInt>()
            .map_err(|_| Error::UnsupportedConversion(format!("'{}' is not an integer", s))),
        other => Err(unsupported(type_name, other)),
    }
}

/// Convert `value` to the integer variant matching `code`.
pub(crate) fn coerce_integer(code: TypeCode, value: &Value) -> Result<Value> {
    if exact_integer(code, value) {
        return Ok(value.clone());
    }
    let big = integral_value(code.name(), value)?;
    bigint_to_integer(code, &big).ok_or_else(|| Error::overflow(code.name(), &big))
}

pub(crate) fn encode_integer(code: TypeCode, buffer: &mut BytesMut, value: &Value) -> Result<()> {
    match coerce_integer(code, value)? {
        Value::Int8(v) => buffer.put_i8(v),
        Value::Int16(v) => buffer.put_i16_le(v),
        Value::Int32(v) => buffer.put_i32_le(v),
        Value::Int64(v) => buffer.put_i64_le(v),
        Value::Int128(v) => buffer.put_slice(&v.to_le_bytes()),
        Value::Int256(v) => buffer.put_slice(&v.to_le_bytes()),
        Value::UInt8(v) => buffer.put_u8(v),
        Value::UInt16(v) => buffer.put_u16_le(v),
        Value::UInt32(v) => buffer.put_u32_le(v),
        Value::UInt64(v) => buffer.put_u64_le(v),
        Value::UInt128(v) => buffer.put_slice(&v.to_le_bytes()),
        Value::UInt256(v) => buffer.put_slice(&v.to_le_bytes()),
        other => return Err(unsupported(code.name(), &other)),
    }
    Ok(())
}

pub(crate) fn decode_float(code: TypeCode, buffer: &mut &[u8]) -> Result<Value> {
    match code {
        TypeCode::Float32 => Ok(Value::Float32(f32::from_le_bytes(read_array(buffer, "Float32")?))),
        _ => Ok(Value::Float64(f64::from_le_bytes(read_array(buffer, "Float64")?))),
    }
}

/// Numeric value as `f64`. Integers beyond 2^53 lose precision.
pub(crate) fn coerce_f64(type_name: &str, value: &Value) -> Result<f64> {
    match value {
        Value::Decimal(d) => Ok(d.to_f64()),
        Value::NativeDecimal(d) => d.to_f64().ok_or_else(|| Error::overflow(type_name, d)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::UnsupportedConversion(format!("'{}' is not a number", s))),
        other => other.as_f64().ok_or_else(|| unsupported(type_name, other)),
    }
}

pub(crate) fn encode_float(code: TypeCode, buffer: &mut BytesMut, value: &Value) -> Result<()> {
    match (code, value) {
        (TypeCode::Float32, Value::Float32(v)) => buffer.put_f32_le(*v),
        (TypeCode::Float32, other) => {
            buffer.put_f32_le(coerce_f64(code.name(), other)? as f32)
        }
        (_, other) => buffer.put_f64_le(coerce_f64(code.name(), other)?),
    }
    Ok(())
}

pub(crate) fn coerce_bool(value: &Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => match s.trim() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(Error::UnsupportedConversion(format!("'{}' is not a Bool", s))),
        },
        other => {
            let v = other.as_bigint().ok_or_else(|| unsupported("Bool", other))?;
            if v.is_zero() {
                Ok(false)
            } else if v == BigInt::from(1) {
                Ok(true)
            } else {
                Err(Error::overflow("Bool", v))
            }
        }
    }
}

pub(crate) fn decode_bool(buffer: &mut &[u8]) -> Result<Value> {
    let [b] = read_array::<1>(buffer, "Bool")?;
    Ok(Value::Bool(b != 0))
}

pub(crate) fn encode_bool(buffer: &mut BytesMut, value: &Value) -> Result<()> {
    buffer.put_u8(coerce_bool(value)? as u8);
    Ok(())
}
