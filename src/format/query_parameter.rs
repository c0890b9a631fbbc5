//! HTTP query parameter rendering.
//!
//! The server parses a parameter with the type declared in its
//! `{name:Type}` placeholder, so scalars are sent as raw text. Inside a
//! container, text is single-quoted and NULL is `null`; at the top level,
//! text is only escaped and NULL is `\N`.

use super::{
    decimal_text,
    escape_string,
    format_float,
    format_float32,
    join,
    quote_string,
    FormatMode,
    NULL_PARAMETER,
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
use tracing::debug;

fn unsupported(ty: &Type, value: &Value) -> Error {
    Error::UnsupportedConversion(format!("Cannot format {} as {}", value.kind(), ty))
}

fn text(s: &str, nested: bool) -> String {
    if nested {
        quote_string(s)
    } else {
        escape_string(s)
    }
}

fn string_text(type_name: &str, value: &Value, nested: bool) -> Result<String> {
    let data = string_bytes(type_name, value)?;
    let s = std::str::from_utf8(data).map_err(|_| {
        Error::UnsupportedConversion(format!(
            "{} query parameters must be valid UTF-8",
            type_name
        ))
    })?;
    Ok(text(s, nested))
}

pub(crate) fn format_parameter(ty: &Type, value: &Value, nested: bool) -> Result<String> {
    if value.is_null() {
        return Ok(if nested { "null" } else { NULL_PARAMETER }.to_string());
    }
    match ty {
        Type::Simple(code) => format_simple(ty, *code, value, nested),
        Type::FixedString { size } => {
            let type_name = format!("FixedString({})", size);
            let length = string_bytes(&type_name, value)?.len();
            if length > *size {
                return Err(Error::overflow(type_name, format!("{} bytes", length)));
            }
            string_text(&type_name, value, nested)
        }
        Type::DateTime { timezone } => {
            let tz = timezone.tz();
            let dt = coerce_datetime("DateTime", value, tz)?.with_timezone(&tz);
            Ok(text(&format_datetime(&dt, 0)?, nested))
        }
        Type::DateTime64 { precision, timezone } => {
            let tz = timezone.tz();
            let type_name = format!("DateTime64({})", precision);
            let dt = coerce_datetime(&type_name, value, tz)?.with_timezone(&tz);
            Ok(text(&format_datetime(&dt, *precision)?, nested))
        }
        Type::Decimal { precision, scale, .. } => decimal_text(*precision, *scale, value),
        Type::Enum8 { items } => Ok(text(enum_symbol(items, "Enum8", value)?, nested)),
        Type::Enum16 { items } => Ok(text(enum_symbol(items, "Enum16", value)?, nested)),
        Type::Array { item_type } => {
            let items = array_items(ty, value)?;
            Ok(format!(
                "[{}]",
                join(items.iter().map(|v| format_parameter(item_type, v, true)))?
            ))
        }
        Type::Nullable { nested_type }
        | Type::LowCardinality { nested_type }
        | Type::SimpleAggregateFunction { nested_type, .. } => {
            format_parameter(nested_type, value, nested)
        }
        Type::Tuple { item_types, item_names } => {
            let elements = tuple_elements(ty, item_types, item_names.as_deref(), value)?;
            let body = join(
                item_types
                    .iter()
                    .zip(elements)
                    .map(|(item_type, v)| format_parameter(item_type, v, true)),
            )?;
            Ok(format!("({})", body))
        }
        Type::Nested { fields } => {
            let row_type = Type::Tuple {
                item_types: fields.iter().map(|(_, t)| t.clone()).collect(),
                item_names: Some(fields.iter().map(|(n, _)| n.clone()).collect()),
            };
            let rows = array_items(ty, value)?;
            Ok(format!(
                "[{}]",
                join(rows.iter().map(|row| format_parameter(&row_type, row, true)))?
            ))
        }
        Type::Map { key_type, value_type } => {
            let entries = match value {
                Value::Map(entries) => entries,
                other => return Err(unsupported(ty, other)),
            };
            let body = join(entries.iter().map(|(k, v)| {
                Ok(format!(
                    "{}:{}",
                    format_parameter(key_type, k, true)?,
                    format_parameter(value_type, v, true)?
                ))
            }))?;
            Ok(format!("{{{}}}", body))
        }
        Type::Variant { variants } => {
            let (index, _) = select_variant(variants, value)?;
            format_parameter(&variants[index], value, nested)
        }
    }
}

fn format_simple(ty: &Type, code: TypeCode, value: &Value, nested: bool) -> Result<String> {
    match code {
        TypeCode::Nothing => Err(unsupported(ty, value)),
        TypeCode::Bool => Ok(coerce_bool(value)?.to_string()),
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
        | TypeCode::UInt256 => Ok(coerce_integer(code, value)?.to_string()),
        TypeCode::Float32 => match value {
            Value::Float32(v) => Ok(format_float32(*v)),
            other => Ok(format_float32(coerce_f64(code.name(), other)? as f32)),
        },
        TypeCode::Float64 => Ok(format_float(coerce_f64(code.name(), value)?)),
        TypeCode::String => string_text("String", value, nested),
        TypeCode::Date | TypeCode::Date32 => {
            let date = coerce_date(code.name(), value, Tz::UTC)?;
            Ok(text(&date.format("%Y-%m-%d").to_string(), nested))
        }
        TypeCode::UUID => Ok(text(&coerce_uuid(value)?.to_string(), nested)),
        TypeCode::IPv4 => Ok(text(&coerce_ipv4(value)?.to_string(), nested)),
        TypeCode::IPv6 => Ok(text(&coerce_ipv6(value)?.to_string(), nested)),
        TypeCode::Dynamic => format_parameter(&infer_type(value)?, value, nested),
        TypeCode::Json | TypeCode::Object => Ok(text(&json_text(value)?, nested)),
        TypeCode::Point | TypeCode::Ring | TypeCode::Polygon | TypeCode::MultiPolygon => {
            match Type::geo_layout(code) {
                Some(layout) => format_parameter(&layout, value, nested),
                None => Err(unsupported(ty, value)),
            }
        }
        _ => Err(Error::UnknownType(format!("{} requires parameters", code.name()))),
    }
}

fn check_name(name: &str) -> Result<()> {
    let valid = name.chars().next().map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!("Invalid query parameter name '{}'", name)))
    }
}

/// The HTTP field for a `{name:Type}` placeholder: `("param_<name>", text)`.
pub fn query_parameter(name: &str, ty: &Type, value: &Value) -> Result<(String, String)> {
    check_name(name)?;
    let text = ty.format(value, FormatMode::QueryParameter)?;
    debug!(parameter = name, type_name = %ty, "formatted query parameter");
    Ok((format!("param_{}", name), text))
}

/// [`query_parameter`] as a percent-encoded `param_<name>=<text>` pair.
pub fn encode_query_parameter(name: &str, ty: &Type, value: &Value) -> Result<String> {
    let (key, text) = query_parameter(name, ty, value)?;
    Ok(format!("{}={}", urlencoding::encode(&key), urlencoding::encode(&text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{
        NaiveDate,
        NaiveDateTime,
    };

    fn param(type_str: &str, value: Value) -> String {
        Type::parse(type_str).unwrap().format(&value, FormatMode::QueryParameter).unwrap()
    }

    #[test]
    fn test_top_level_text_is_unquoted() {
        assert_eq!(param("String", Value::from("it's\n")), "it\\'s\\n");
        assert_eq!(param("Nullable(String)", Value::Null), "\\N");
        assert_eq!(param("Decimal(10, 3)", Value::from("2.5")), "2.500");
        assert_eq!(param("UInt256", Value::UInt64(9)), "9");
    }

    #[test]
    fn test_nested_text_is_quoted() {
        let value = Value::Array(vec![Value::from("a"), Value::Null]);
        assert_eq!(param("Array(Nullable(String))", value), "['a',null]");

        let map = Value::Map(vec![(Value::from("k"), Value::Int32(1))]);
        assert_eq!(param("Map(String, Int32)", map), "{'k':1}");

        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let tuple = Value::Tuple(vec![Value::Date(date), Value::Float64(0.5)]);
        assert_eq!(param("Tuple(Date, Float64)", tuple), "('2024-01-31',0.5)");
    }

    #[test]
    fn test_datetime_precision() {
        let naive = NaiveDateTime::parse_from_str("2024-01-31 08:09:10.123456", "%Y-%m-%d %H:%M:%S%.f")
            .unwrap();
        assert_eq!(param("DateTime64(3)", Value::NaiveDateTime(naive)), "2024-01-31 08:09:10.123");
        assert_eq!(param("DateTime", Value::NaiveDateTime(naive)), "2024-01-31 08:09:10");
    }

    #[test]
    fn test_non_utf8_rejected() {
        let ty = Type::string();
        assert!(matches!(
            ty.format(&Value::Bytes(vec![0xFF]), FormatMode::QueryParameter),
            Err(Error::UnsupportedConversion(_))
        ));
    }

    #[test]
    fn test_query_parameter_pair() {
        let (key, text) = query_parameter("id", &Type::uint32(), &Value::UInt32(5)).unwrap();
        assert_eq!((key.as_str(), text.as_str()), ("param_id", "5"));

        let encoded = encode_query_parameter("s", &Type::string(), &Value::from("a b&c")).unwrap();
        assert_eq!(encoded, "param_s=a%20b%26c");

        assert!(matches!(
            query_parameter("bad name", &Type::uint32(), &Value::UInt32(5)),
            Err(Error::InvalidArgument(_))
        ));
    }
}
