//! Decimal(P, S) codec.
//!
//! The wire value is the mantissa at scale S as a W-byte little-endian two's
//! complement integer, W being 4, 8, 16 or 32 depending on P.

use super::numeric::coerce_f64;
use crate::{
    io::buffer_utils::read_bytes,
    numeric::{
        decimal::digit_count,
        ClickHouseDecimal,
    },
    types::Type,
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
    Signed,
    Zero,
};

fn type_name(precision: u32, scale: u32) -> String {
    format!("Decimal({}, {})", precision, scale)
}

/// Convert a numeric value to a decimal without losing digits.
pub(crate) fn coerce_decimal(type_name: &str, value: &Value) -> Result<ClickHouseDecimal> {
    match value {
        Value::Decimal(d) => Ok(d.clone()),
        Value::NativeDecimal(d) => Ok(ClickHouseDecimal::from(*d)),
        Value::String(s) => s.trim().parse::<ClickHouseDecimal>().map_err(|_| {
            Error::UnsupportedConversion(format!("'{}' is not a valid {}", s, type_name))
        }),
        Value::Float32(_) | Value::Float64(_) => {
            ClickHouseDecimal::from_f64(coerce_f64(type_name, value)?)
        }
        other => other.as_bigint().map(|m| ClickHouseDecimal::new(m, 0)).ok_or_else(|| {
            Error::UnsupportedConversion(format!(
                "Cannot convert {} to {}",
                other.kind(),
                type_name
            ))
        }),
    }
}

/// Mantissa of `value` at `scale`, checked against `precision` digits.
/// Digits beyond `scale` are truncated toward zero.
pub(crate) fn decimal_mantissa(precision: u32, scale: u32, value: &Value) -> Result<BigInt> {
    let name = type_name(precision, scale);
    let decimal = coerce_decimal(&name, value)?;
    let mantissa = decimal.to_scale(scale);
    if !mantissa.is_zero() && digit_count(&mantissa) > precision {
        return Err(Error::overflow(name, decimal));
    }
    Ok(mantissa)
}

pub(crate) fn encode_decimal(
    precision: u32,
    scale: u32,
    buffer: &mut BytesMut,
    value: &Value,
) -> Result<()> {
    let width = Type::decimal_width(precision);
    let mantissa = decimal_mantissa(precision, scale, value)?;
    let bytes = mantissa.to_signed_bytes_le();
    if bytes.len() > width {
        return Err(Error::overflow(type_name(precision, scale), &mantissa));
    }
    let fill = if mantissa.is_negative() { 0xFF } else { 0x00 };
    buffer.put_slice(&bytes);
    buffer.put_bytes(fill, width - bytes.len());
    Ok(())
}

pub(crate) fn decode_decimal(
    precision: u32,
    scale: u32,
    use_big_decimal: bool,
    buffer: &mut &[u8],
) -> Result<Value> {
    let width = Type::decimal_width(precision);
    let bytes = read_bytes(buffer, width, "Decimal")?;
    let decimal = ClickHouseDecimal::new(BigInt::from_signed_bytes_le(bytes), scale);
    if use_big_decimal {
        Ok(Value::Decimal(decimal))
    } else {
        Ok(Value::NativeDecimal(rust_decimal::Decimal::try_from(&decimal)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(precision: u32, scale: u32, value: Value) -> Result<Vec<u8>> {
        let mut buffer = BytesMut::new();
        encode_decimal(precision, scale, &mut buffer, &value)?;
        Ok(buffer.to_vec())
    }

    #[test]
    fn test_decimal32_layout() {
        let value = Value::Decimal("-1.5".parse().unwrap());
        assert_eq!(encode(9, 2, value).unwrap(), (-150i32).to_le_bytes().to_vec());
    }

    #[test]
    fn test_rescale_and_truncate() {
        let value = Value::Decimal("1.239".parse().unwrap());
        assert_eq!(encode(18, 2, value).unwrap(), 123i64.to_le_bytes().to_vec());
        assert_eq!(encode(18, 3, Value::Int32(7)).unwrap(), 7000i64.to_le_bytes().to_vec());
    }

    #[test]
    fn test_precision_overflow() {
        let value = Value::Decimal("12345.6".parse().unwrap());
        assert!(matches!(encode(5, 2, value), Err(Error::EncodingOverflow { .. })));
    }

    #[test]
    fn test_decimal256_roundtrip() {
        let text = "-123456789012345678901234567890123456789012345.123456789";
        let value = Value::Decimal(text.parse().unwrap());
        let bytes = encode(76, 9, value.clone()).unwrap();
        assert_eq!(bytes.len(), 32);

        let mut slice = &bytes[..];
        assert_eq!(decode_decimal(76, 9, true, &mut slice).unwrap(), value);
    }

    #[test]
    fn test_native_decimal_decode() {
        let bytes = encode(18, 4, Value::from("3.1415")).unwrap();
        let mut slice = &bytes[..];
        assert_eq!(
            decode_decimal(18, 4, false, &mut slice).unwrap(),
            Value::NativeDecimal(rust_decimal::Decimal::new(31415, 4))
        );
    }

    #[test]
    fn test_native_decimal_overflow() {
        let bytes = encode(76, 0, Value::from("1".repeat(40).as_str())).unwrap();
        let mut slice = &bytes[..];
        assert!(matches!(
            decode_decimal(76, 0, false, &mut slice),
            Err(Error::DecimalOverflow(_))
        ));
    }
}
