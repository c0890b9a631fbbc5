//! Language-native representation of one ClickHouse value.
//!
//! Decoding produces a [`Value`] whose variant is determined by the column
//! type; encoding accepts a [`Value`] and converts it to the column type
//! where that is lossless (an `Int64(5)` can be written to a `UInt8`
//! column, an `Int64(256)` cannot).

use crate::numeric::{
    ClickHouseDecimal,
    Int128,
    Int256,
    UInt128,
    UInt256,
};
use chrono::{
    DateTime,
    NaiveDate,
    NaiveDateTime,
    Utc,
};
use chrono_tz::Tz;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use std::{
    fmt,
    net::{
        Ipv4Addr,
        Ipv6Addr,
    },
};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Int128(Int128),
    Int256(Int256),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    UInt128(UInt128),
    UInt256(UInt256),
    Float32(f32),
    Float64(f64),
    /// Arbitrary-precision decimal.
    Decimal(ClickHouseDecimal),
    /// Native decimal, produced when big decimals are disabled.
    NativeDecimal(rust_decimal::Decimal),
    String(String),
    /// String or FixedString content that is not valid UTF-8.
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Date(NaiveDate),
    DateTime(DateTime<Tz>),
    /// Timestamp without zone, interpreted in the column's timezone.
    NaiveDateTime(NaiveDateTime),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Array(Vec<Value>),
    Tuple(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int8(_) => "Int8",
            Value::Int16(_) => "Int16",
            Value::Int32(_) => "Int32",
            Value::Int64(_) => "Int64",
            Value::Int128(_) => "Int128",
            Value::Int256(_) => "Int256",
            Value::UInt8(_) => "UInt8",
            Value::UInt16(_) => "UInt16",
            Value::UInt32(_) => "UInt32",
            Value::UInt64(_) => "UInt64",
            Value::UInt128(_) => "UInt128",
            Value::UInt256(_) => "UInt256",
            Value::Float32(_) => "Float32",
            Value::Float64(_) => "Float64",
            Value::Decimal(_) => "Decimal",
            Value::NativeDecimal(_) => "NativeDecimal",
            Value::String(_) => "String",
            Value::Bytes(_) => "Bytes",
            Value::Uuid(_) => "UUID",
            Value::Date(_) => "Date",
            Value::DateTime(_) => "DateTime",
            Value::NaiveDateTime(_) => "NaiveDateTime",
            Value::Ipv4(_) => "IPv4",
            Value::Ipv6(_) => "IPv6",
            Value::Array(_) => "Array",
            Value::Tuple(_) => "Tuple",
            Value::Map(_) => "Map",
            Value::Json(_) => "JSON",
        }
    }

    /// Integer variants as an arbitrary-precision integer.
    pub fn as_bigint(&self) -> Option<BigInt> {
        Some(match self {
            Value::Int8(v) => BigInt::from(*v),
            Value::Int16(v) => BigInt::from(*v),
            Value::Int32(v) => BigInt::from(*v),
            Value::Int64(v) => BigInt::from(*v),
            Value::Int128(v) => v.to_bigint(),
            Value::Int256(v) => v.to_bigint(),
            Value::UInt8(v) => BigInt::from(*v),
            Value::UInt16(v) => BigInt::from(*v),
            Value::UInt32(v) => BigInt::from(*v),
            Value::UInt64(v) => BigInt::from(*v),
            Value::UInt128(v) => v.to_bigint(),
            Value::UInt256(v) => v.to_bigint(),
            _ => return None,
        })
    }

    /// Integer and float variants as `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            other => other.as_bigint().and_then(|v| v.to_f64()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Bytes of a `String` or `Bytes` value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::String(s) => Some(s.as_bytes()),
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Convert to a JSON value. Numbers outside the `f64`/`i64`/`u64`
    /// range and temporal values become strings.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Null => Json::Null,
            Value::Bool(v) => Json::Bool(*v),
            Value::Int8(v) => Json::from(*v),
            Value::Int16(v) => Json::from(*v),
            Value::Int32(v) => Json::from(*v),
            Value::Int64(v) => Json::from(*v),
            Value::UInt8(v) => Json::from(*v),
            Value::UInt16(v) => Json::from(*v),
            Value::UInt32(v) => Json::from(*v),
            Value::UInt64(v) => Json::from(*v),
            Value::Float32(v) => serde_json::Number::from_f64(*v as f64)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Float64(v) => serde_json::Number::from_f64(*v)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::Array(items) | Value::Tuple(items) => {
                Json::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(entries) => {
                let object = entries
                    .iter()
                    .map(|(k, v)| {
                        let key = match k {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (key, v.to_json())
                    })
                    .collect();
                Json::Object(object)
            }
            Value::Json(json) => json.clone(),
            other => Json::String(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Int128(v) => write!(f, "{}", v),
            Value::Int256(v) => write!(f, "{}", v),
            Value::UInt8(v) => write!(f, "{}", v),
            Value::UInt16(v) => write!(f, "{}", v),
            Value::UInt32(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
            Value::UInt128(v) => write!(f, "{}", v),
            Value::UInt256(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::NativeDecimal(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{:?}", v),
            Value::Bytes(v) => write!(f, "{:?}", v),
            Value::Uuid(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v),
            Value::DateTime(v) => write!(f, "{}", v),
            Value::NaiveDateTime(v) => write!(f, "{}", v),
            Value::Ipv4(v) => write!(f, "{}", v),
            Value::Ipv6(v) => write!(f, "{}", v),
            Value::Array(items) => write_list(f, "[", items, "]"),
            Value::Tuple(items) => write_list(f, "(", items, ")"),
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
            Value::Json(v) => write!(f, "{}", v),
        }
    }
}

fn write_list(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    items: &[Value],
    close: &str,
) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    f.write_str(close)
}

macro_rules! value_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    Value::$variant(value)
                }
            }
        )*
    };
}

value_from!(
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    Int128 => Int128,
    Int256 => Int256,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    UInt128 => UInt128,
    UInt256 => UInt256,
    f32 => Float32,
    f64 => Float64,
    ClickHouseDecimal => Decimal,
    rust_decimal::Decimal => NativeDecimal,
    String => String,
    Uuid => Uuid,
    NaiveDate => Date,
    DateTime<Tz> => DateTime,
    NaiveDateTime => NaiveDateTime,
    Ipv4Addr => Ipv4,
    Ipv6Addr => Ipv6,
    Vec<Value> => Array,
    serde_json::Value => Json,
);

impl From<i128> for Value {
    fn from(value: i128) -> Self {
        Value::Int128(Int128::from(value))
    }
}

impl From<u128> for Value {
    fn from(value: u128) -> Self {
        Value::UInt128(UInt128::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value.with_timezone(&Tz::UTC))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_conversions() {
        assert_eq!(Value::from(5u8), Value::UInt8(5));
        assert_eq!(Value::from("x"), Value::String("x".to_string()));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(7i64)), Value::Int64(7));
        assert_eq!(Value::from(-1i128), Value::Int128(Int128::from(-1)));
    }

    #[test]
    fn test_as_bigint() {
        assert_eq!(Value::UInt64(u64::MAX).as_bigint(), Some(BigInt::from(u64::MAX)));
        assert_eq!(Value::Int8(-3).as_bigint(), Some(BigInt::from(-3)));
        assert_eq!(Value::Float64(1.0).as_bigint(), None);
    }

    #[test]
    fn test_to_json() {
        let value = Value::Map(vec![(
            Value::from("a"),
            Value::Array(vec![Value::Int32(1), Value::Null]),
        )]);
        assert_eq!(value.to_json(), serde_json::json!({"a": [1, null]}));
        assert_eq!(Value::Float64(f64::NAN).to_json(), serde_json::Value::Null);
    }
}
