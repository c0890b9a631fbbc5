//! Inline SQL literal rendering.
//!
//! Scalars that ClickHouse would otherwise read as a different type are
//! wrapped in a conversion function: `toInt128('..')`, `toDate('..')`,
//! `toDecimal64('..', S)`, `toUUID('..')`.

use super::{
    decimal_text,
    format_float,
    format_float32,
    join,
    quote_string,
};
use crate::{
    codec::{
        composite::{
            array_items,
            select_variant,
            tuple_elements,
        },
        date::{
            coerce_date,
            coerce_datetime,
            format_datetime,
        },
        dynamic::{
            infer_type,
            json_text,
        },
        enums::enum_symbol,
        network::{
            coerce_ipv4,
            coerce_ipv6,
            coerce_uuid,
        },
        numeric::{
            coerce_bool,
            coerce_f64,
            coerce_integer,
        },
        string::string_bytes,
    },
    types::{
        Type,
        TypeCode,
    },
    Error,
    Result,
    Value,
};
use chrono_tz::Tz;

fn unsupported(ty: &Type, value: &Value) -> Error {
    Error::UnsupportedConversion(format!("Cannot format {} as {}", value.kind(), ty))
}

fn string_literal(type_name: &str, value: &Value) -> Result<String> {
    let data = string_bytes(type_name, value)?;
    Ok(match std::str::from_utf8(data) {
        Ok(s) => quote_string(s),
        Err(_) => {
            let hex: String = data.iter().map(|b| format!("{:02X}", b)).collect();
            format!("unhex('{}')", hex)
        }
    })
}

fn decimal_function(precision: u32) -> &'static str {
    match Type::decimal_width(precision) {
        4 => "toDecimal32",
        8 => "toDecimal64",
        16 => "toDecimal128",
        _ => "toDecimal256",
    }
}

pub(crate) fn format_literal(ty: &Type, value: &Value) -> Result<String> {
    if value.is_null() {
        return Ok("null".to_string());
    }
    match ty {
        Type::Simple(code) => format_simple(ty, *code, value),
        Type::FixedString { size } => {
            let type_name = format!("FixedString({})", size);
            let length = string_bytes(&type_name, value)?.len();
            if length > *size {
                return Err(Error::overflow(type_name, format!("{} bytes", length)));
            }
            string_literal(&type_name, value)
        }
        Type::DateTime { timezone } => {
            let tz = timezone.tz();
            let dt = coerce_datetime("DateTime", value, tz)?.with_timezone(&tz);
            Ok(format!(
                "toDateTime({}, {})",
                quote_string(&format_datetime(&dt, 0)?),
                quote_string(tz.name())
            ))
        }
        Type::DateTime64 { precision, timezone } => {
            let tz = timezone.tz();
            let type_name = format!("DateTime64({})", precision);
            let dt = coerce_datetime(&type_name, value, tz)?.with_timezone(&tz);
            Ok(format!(
                "toDateTime64({}, {}, {})",
                quote_string(&format_datetime(&dt, *precision)?),
                precision,
                quote_string(tz.name())
            ))
        }
        Type::Decimal { precision, scale, .. } => Ok(format!(
            "{}('{}', {})",
            decimal_function(*precision),
            decimal_text(*precision, *scale, value)?,
            scale
        )),
        Type::Enum8 { items } => Ok(quote_string(enum_symbol(items, "Enum8", value)?)),
        Type::Enum16 { items } => Ok(quote_string(enum_symbol(items, "Enum16", value)?)),
        Type::Array { item_type } => {
            let items = array_items(ty, value)?;
            Ok(format!("[{}]", join(items.iter().map(|v| format_literal(item_type, v)))?))
        }
        Type::Nullable { nested_type }
        | Type::LowCardinality { nested_type }
        | Type::SimpleAggregateFunction { nested_type, .. } => {
            format_literal(nested_type, value)
        }
        Type::Tuple { item_types, item_names } => {
            let elements = tuple_elements(ty, item_types, item_names.as_deref(), value)?;
            let body = join(
                item_types
                    .iter()
                    .zip(elements)
                    .map(|(item_type, v)| format_literal(item_type, v)),
            )?;
            if item_types.len() == 1 {
                Ok(format!("tuple({})", body))
            } else {
                Ok(format!("({})", body))
            }
        }
        Type::Nested { fields } => {
            let row_type = Type::Tuple {
                item_types: fields.iter().map(|(_, t)| t.clone()).collect(),
                item_names: Some(fields.iter().map(|(n, _)| n.clone()).collect()),
            };
            let rows = array_items(ty, value)?;
            Ok(format!("[{}]", join(rows.iter().map(|row| format_literal(&row_type, row)))?))
        }
        Type::Map { key_type, value_type } => {
            let entries = match value {
                Value::Map(entries) => entries,
                other => return Err(unsupported(ty, other)),
            };
            let body = join(entries.iter().map(|(k, v)| {
                Ok(format!("{}:{}", format_literal(key_type, k)?, format_literal(value_type, v)?))
            }))?;
            Ok(format!("{{{}}}", body))
        }
        Type::Variant { variants } => {
            let (index, _) = select_variant(variants, value)?;
            format_literal(&variants[index], value)
        }
    }
}

fn format_simple(ty: &Type, code: TypeCode, value: &Value) -> Result<String> {
    match code {
        TypeCode::Nothing => Err(unsupported(ty, value)),
        TypeCode::Bool => Ok(coerce_bool(value)?.to_string()),
        TypeCode::Int8
        | TypeCode::Int16
        | TypeCode::Int32
        | TypeCode::Int64
        | TypeCode::UInt8
        | TypeCode::UInt16
        | TypeCode::UInt32
        | TypeCode::UInt64 => Ok(coerce_integer(code, value)?.to_string()),
        TypeCode::Int128 | TypeCode::Int256 | TypeCode::UInt128 | TypeCode::UInt256 => Ok(
            format!("to{}('{}')", code.name(), coerce_integer(code, value)?),
        ),
        TypeCode::Float32 => match value {
            Value::Float32(v) => Ok(format_float32(*v)),
            other => Ok(format_float32(coerce_f64(code.name(), other)? as f32)),
        },
        TypeCode::Float64 => Ok(format_float(coerce_f64(code.name(), value)?)),
        TypeCode::String => string_literal("String", value),
        TypeCode::Date | TypeCode::Date32 => {
            let date = coerce_date(code.name(), value, Tz::UTC)?;
            Ok(format!("to{}('{}')", code.name(), date.format("%Y-%m-%d")))
        }
        TypeCode::UUID => Ok(format!("toUUID('{}')", coerce_uuid(value)?)),
        TypeCode::IPv4 => Ok(format!("toIPv4('{}')", coerce_ipv4(value)?)),
        TypeCode::IPv6 => Ok(format!("toIPv6('{}')", coerce_ipv6(value)?)),
        TypeCode::Dynamic => format_literal(&infer_type(value)?, value),
        TypeCode::Json | TypeCode::Object => Ok(quote_string(&json_text(value)?)),
        TypeCode::Point | TypeCode::Ring | TypeCode::Polygon | TypeCode::MultiPolygon => {
            match Type::geo_layout(code) {
                Some(layout) => format_literal(&layout, value),
                None => Err(unsupported(ty, value)),
            }
        }
        _ => Err(Error::UnknownType(format!("{} requires parameters", code.name()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FormatMode;
    use chrono::{
        NaiveDate,
        TimeZone,
    };

    fn literal(type_str: &str, value: Value) -> String {
        Type::parse(type_str).unwrap().format(&value, FormatMode::SqlLiteral).unwrap()
    }

    #[test]
    fn test_scalars() {
        assert_eq!(literal("Int32", Value::Int64(-5)), "-5");
        assert_eq!(literal("UInt128", Value::UInt64(7)), "toUInt128('7')");
        assert_eq!(literal("Float64", Value::Float64(f64::INFINITY)), "inf");
        assert_eq!(literal("Bool", Value::Bool(false)), "false");
        assert_eq!(literal("String", Value::from("a\nb")), "'a\\nb'");
        assert_eq!(literal("String", Value::Bytes(vec![0xFF, 0x00])), "unhex('FF00')");
        assert_eq!(literal("Nullable(String)", Value::Null), "null");
    }

    #[test]
    fn test_temporal() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(literal("Date32", Value::Date(date)), "toDate32('2024-02-29')");

        let dt = chrono_tz::Europe::Berlin.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(
            literal("DateTime('UTC')", Value::DateTime(dt)),
            "toDateTime('2024-06-01 10:00:00', 'UTC')"
        );
        assert_eq!(
            literal("DateTime64(3, 'Europe/Berlin')", Value::DateTime(dt)),
            "toDateTime64('2024-06-01 12:00:00.000', 3, 'Europe/Berlin')"
        );
    }

    #[test]
    fn test_decimal() {
        let value = Value::Decimal("12.3".parse().unwrap());
        assert_eq!(literal("Decimal(18, 2)", value.clone()), "toDecimal64('12.30', 2)");
        assert_eq!(literal("Decimal256(4)", value), "toDecimal256('12.3000', 4)");
    }

    #[test]
    fn test_containers() {
        let tuple = Value::Tuple(vec![Value::Int32(1), Value::from("x")]);
        assert_eq!(literal("Tuple(Int32, String)", tuple), "(1,'x')");
        assert_eq!(literal("Tuple(Int32)", Value::Tuple(vec![Value::Int32(1)])), "tuple(1)");

        let map = Value::Map(vec![(Value::from("k"), Value::Null)]);
        assert_eq!(literal("Map(String, Nullable(UInt8))", map), "{'k':null}");

        let array = Value::Array(vec![Value::Null, Value::Int32(2)]);
        assert_eq!(literal("Array(Nullable(Int32))", array), "[null,2]");
    }

    #[test]
    fn test_rejects_mismatched_values() {
        let ty = Type::parse("Array(Int32)").unwrap();
        assert!(ty.format(&Value::from("x"), FormatMode::SqlLiteral).is_err());
        let ty = Type::parse("Enum8('a' = 1)").unwrap();
        assert!(matches!(
            ty.format(&Value::from("b"), FormatMode::SqlLiteral),
            Err(Error::EnumLookup(_))
        ));
    }
}
