//! Binary type encoding
//!
//! `Dynamic` and `JSON` values carry their own type on the wire as a
//! one-byte family code followed by the family's parameters. Lengths and
//! counts are LEB128 varints.
//!
//! Reference: <https://clickhouse.com/docs/en/sql-reference/data-types/data-types-binary-encoding>

use super::{
    parser::MAX_DEPTH,
    EnumItem,
    TimeZone,
    Type,
    TypeCode,
    TypeRegistry,
    MAX_DATETIME64_PRECISION,
    MAX_DECIMAL_PRECISION,
};
use crate::{
    io::buffer_utils::{
        read_bytes,
        read_length,
        read_string,
        write_string,
        write_varint,
    },
    Error,
    Result,
    TypeSettings,
};
use bytes::{
    BufMut,
    BytesMut,
};
use chrono_tz::Tz;

pub const NOTHING: u8 = 0x00;
pub const UINT8: u8 = 0x01;
pub const UINT16: u8 = 0x02;
pub const UINT32: u8 = 0x03;
pub const UINT64: u8 = 0x04;
pub const UINT128: u8 = 0x05;
pub const UINT256: u8 = 0x06;
pub const INT8: u8 = 0x07;
pub const INT16: u8 = 0x08;
pub const INT32: u8 = 0x09;
pub const INT64: u8 = 0x0A;
pub const INT128: u8 = 0x0B;
pub const INT256: u8 = 0x0C;
pub const FLOAT32: u8 = 0x0D;
pub const FLOAT64: u8 = 0x0E;
pub const DATE: u8 = 0x0F;
pub const DATE32: u8 = 0x10;
pub const DATETIME: u8 = 0x11;
pub const DATETIME_TZ: u8 = 0x12;
pub const DATETIME64: u8 = 0x13;
pub const DATETIME64_TZ: u8 = 0x14;
pub const STRING: u8 = 0x15;
pub const FIXED_STRING: u8 = 0x16;
pub const ENUM8: u8 = 0x17;
pub const ENUM16: u8 = 0x18;
pub const DECIMAL32: u8 = 0x19;
pub const DECIMAL64: u8 = 0x1A;
pub const DECIMAL128: u8 = 0x1B;
pub const DECIMAL256: u8 = 0x1C;
pub const UUID: u8 = 0x1D;
pub const ARRAY: u8 = 0x1E;
pub const TUPLE: u8 = 0x1F;
pub const NAMED_TUPLE: u8 = 0x20;
pub const NULLABLE: u8 = 0x23;
pub const LOW_CARDINALITY: u8 = 0x26;
pub const MAP: u8 = 0x27;
pub const IPV4: u8 = 0x28;
pub const IPV6: u8 = 0x29;
pub const VARIANT: u8 = 0x2A;
pub const DYNAMIC: u8 = 0x2B;
/// Named custom type such as `Ring`, followed by the name.
pub const CUSTOM: u8 = 0x2C;
pub const BOOL: u8 = 0x2D;
pub const NESTED: u8 = 0x2F;
pub const JSON: u8 = 0x30;

const JSON_SERIALIZATION_VERSION: u8 = 0;
const DEFAULT_MAX_DYNAMIC_PATHS: u64 = 1024;
const DEFAULT_MAX_DYNAMIC_TYPES: u8 = 32;
const DEFAULT_MAX_TYPES: u8 = 32;

fn read_u8(buffer: &mut &[u8], what: &str) -> Result<u8> {
    Ok(read_bytes(buffer, 1, what)?[0])
}

fn read_timezone(buffer: &mut &[u8]) -> Result<TimeZone> {
    let name = read_string(buffer)?;
    name.parse::<Tz>()
        .map(TimeZone::Explicit)
        .map_err(|_| Error::DecodingFormat(format!("Unknown timezone in type: {}", name)))
}

fn read_types(buffer: &mut &[u8], depth: usize) -> Result<Vec<Type>> {
    let count = read_length(buffer)?;
    (0..count).map(|_| decode_type(buffer, depth)).collect()
}

fn read_named_types(buffer: &mut &[u8], depth: usize) -> Result<Vec<(String, Type)>> {
    let count = read_length(buffer)?;
    (0..count)
        .map(|_| {
            let name = read_string(buffer)?;
            Ok((name, decode_type(buffer, depth)?))
        })
        .collect()
}

fn read_decimal(buffer: &mut &[u8]) -> Result<Type> {
    let precision = read_u8(buffer, "Decimal precision")? as u32;
    let scale = read_u8(buffer, "Decimal scale")? as u32;
    if precision == 0 || precision > MAX_DECIMAL_PRECISION || scale > precision {
        return Err(Error::DecodingFormat(format!(
            "Invalid Decimal({}, {}) in binary type",
            precision, scale
        )));
    }
    Ok(Type::decimal(precision, scale))
}

/// Read one binary-encoded type.
pub fn decode_binary_type(buffer: &mut &[u8]) -> Result<Type> {
    decode_type(buffer, 0)
}

fn decode_type(buffer: &mut &[u8], depth: usize) -> Result<Type> {
    if depth > MAX_DEPTH {
        return Err(Error::DecodingFormat("Binary type is nested too deeply".to_string()));
    }
    let depth = depth + 1;
    let code = read_u8(buffer, "binary type code")?;
    let ty = match code {
        NOTHING => Type::nothing(),
        UINT8 => Type::uint8(),
        UINT16 => Type::uint16(),
        UINT32 => Type::uint32(),
        UINT64 => Type::uint64(),
        UINT128 => Type::uint128(),
        UINT256 => Type::uint256(),
        INT8 => Type::int8(),
        INT16 => Type::int16(),
        INT32 => Type::int32(),
        INT64 => Type::int64(),
        INT128 => Type::int128(),
        INT256 => Type::int256(),
        FLOAT32 => Type::float32(),
        FLOAT64 => Type::float64(),
        DATE => Type::date(),
        DATE32 => Type::date32(),
        DATETIME => Type::datetime(None),
        DATETIME_TZ => Type::DateTime { timezone: read_timezone(buffer)? },
        DATETIME64 | DATETIME64_TZ => {
            let precision = read_u8(buffer, "DateTime64 precision")? as u32;
            if precision > MAX_DATETIME64_PRECISION {
                return Err(Error::DecodingFormat(format!(
                    "DateTime64 precision {} in binary type exceeds {}",
                    precision, MAX_DATETIME64_PRECISION
                )));
            }
            let timezone = if code == DATETIME64_TZ {
                read_timezone(buffer)?
            } else {
                TimeZone::Default(Tz::UTC)
            };
            Type::DateTime64 { precision, timezone }
        }
        STRING => Type::string(),
        FIXED_STRING => Type::fixed_string(read_length(buffer)?),
        ENUM8 | ENUM16 => {
            let count = read_length(buffer)?;
            let mut items = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                let name = read_string(buffer)?;
                let value = if code == ENUM8 {
                    read_u8(buffer, "Enum8 value")? as i8 as i16
                } else {
                    let bytes = read_bytes(buffer, 2, "Enum16 value")?;
                    i16::from_le_bytes([bytes[0], bytes[1]])
                };
                items.push(EnumItem { name, value });
            }
            let items = super::EnumItems::new(items)
                .map_err(|e| Error::DecodingFormat(e.to_string()))?;
            if code == ENUM8 {
                Type::Enum8 { items }
            } else {
                Type::Enum16 { items }
            }
        }
        DECIMAL32 | DECIMAL64 | DECIMAL128 | DECIMAL256 => read_decimal(buffer)?,
        UUID => Type::uuid(),
        ARRAY => Type::array(decode_type(buffer, depth)?),
        TUPLE => Type::tuple(read_types(buffer, depth)?),
        NAMED_TUPLE => {
            let (names, types) = read_named_types(buffer, depth)?.into_iter().unzip();
            Type::Tuple { item_types: types, item_names: Some(names) }
        }
        NULLABLE => Type::nullable(decode_type(buffer, depth)?),
        LOW_CARDINALITY => Type::low_cardinality(decode_type(buffer, depth)?),
        MAP => {
            let key_type = decode_type(buffer, depth)?;
            let value_type = decode_type(buffer, depth)?;
            Type::map(key_type, value_type)
        }
        IPV4 => Type::ipv4(),
        IPV6 => Type::ipv6(),
        VARIANT => Type::variant(read_types(buffer, depth)?),
        DYNAMIC => {
            read_u8(buffer, "Dynamic max_types")?;
            Type::dynamic()
        }
        CUSTOM => {
            let name = read_string(buffer)?;
            match name.as_str() {
                "Point" | "Ring" | "Polygon" | "MultiPolygon" => {
                    TypeRegistry::global().parse(&name, &TypeSettings::default())?
                }
                _ => {
                    return Err(Error::UnsupportedConversion(format!(
                        "Custom binary type {}",
                        name
                    )))
                }
            }
        }
        BOOL => Type::bool(),
        NESTED => Type::Nested { fields: read_named_types(buffer, depth)? },
        JSON => {
            read_u8(buffer, "JSON serialization version")?;
            read_length(buffer)?;
            read_u8(buffer, "JSON max_dynamic_types")?;
            // Typed paths, skipped paths and skipped regexps only affect
            // how the server stores the object.
            read_named_types(buffer, depth)?;
            for _ in 0..2 {
                let count = read_length(buffer)?;
                for _ in 0..count {
                    read_string(buffer)?;
                }
            }
            Type::json()
        }
        other => {
            return Err(Error::DecodingFormat(format!(
                "Unsupported binary type code 0x{:02X}",
                other
            )))
        }
    };
    Ok(ty)
}

fn write_named_types(buffer: &mut BytesMut, fields: &[(&str, &Type)]) -> Result<()> {
    write_varint(buffer, fields.len() as u64);
    for (name, ty) in fields {
        write_string(buffer, name);
        encode_binary_type(ty, buffer)?;
    }
    Ok(())
}

/// Write the binary encoding of `ty`.
pub fn encode_binary_type(ty: &Type, buffer: &mut BytesMut) -> Result<()> {
    match ty {
        Type::Simple(code) => {
            let tag = match code {
                TypeCode::Nothing => NOTHING,
                TypeCode::Bool => BOOL,
                TypeCode::Int8 => INT8,
                TypeCode::Int16 => INT16,
                TypeCode::Int32 => INT32,
                TypeCode::Int64 => INT64,
                TypeCode::Int128 => INT128,
                TypeCode::Int256 => INT256,
                TypeCode::UInt8 => UINT8,
                TypeCode::UInt16 => UINT16,
                TypeCode::UInt32 => UINT32,
                TypeCode::UInt64 => UINT64,
                TypeCode::UInt128 => UINT128,
                TypeCode::UInt256 => UINT256,
                TypeCode::Float32 => FLOAT32,
                TypeCode::Float64 => FLOAT64,
                TypeCode::String => STRING,
                TypeCode::Date => DATE,
                TypeCode::Date32 => DATE32,
                TypeCode::UUID => UUID,
                TypeCode::IPv4 => IPV4,
                TypeCode::IPv6 => IPV6,
                TypeCode::Dynamic => {
                    buffer.put_u8(DYNAMIC);
                    buffer.put_u8(DEFAULT_MAX_TYPES);
                    return Ok(());
                }
                TypeCode::Json | TypeCode::Object => {
                    buffer.put_u8(JSON);
                    buffer.put_u8(JSON_SERIALIZATION_VERSION);
                    write_varint(buffer, DEFAULT_MAX_DYNAMIC_PATHS);
                    buffer.put_u8(DEFAULT_MAX_DYNAMIC_TYPES);
                    for _ in 0..3 {
                        write_varint(buffer, 0);
                    }
                    return Ok(());
                }
                TypeCode::Point
                | TypeCode::Ring
                | TypeCode::Polygon
                | TypeCode::MultiPolygon => {
                    buffer.put_u8(CUSTOM);
                    write_string(buffer, code.name());
                    return Ok(());
                }
                other => {
                    return Err(Error::UnsupportedConversion(format!(
                        "No binary encoding for {}",
                        other.name()
                    )))
                }
            };
            buffer.put_u8(tag);
        }
        Type::FixedString { size } => {
            buffer.put_u8(FIXED_STRING);
            write_varint(buffer, *size as u64);
        }
        Type::DateTime { timezone } => match timezone.explicit() {
            Some(tz) => {
                buffer.put_u8(DATETIME_TZ);
                write_string(buffer, tz.name());
            }
            None => buffer.put_u8(DATETIME),
        },
        Type::DateTime64 { precision, timezone } => match timezone.explicit() {
            Some(tz) => {
                buffer.put_u8(DATETIME64_TZ);
                buffer.put_u8(*precision as u8);
                write_string(buffer, tz.name());
            }
            None => {
                buffer.put_u8(DATETIME64);
                buffer.put_u8(*precision as u8);
            }
        },
        Type::Decimal { precision, scale, .. } => {
            let tag = match Type::decimal_width(*precision) {
                4 => DECIMAL32,
                8 => DECIMAL64,
                16 => DECIMAL128,
                _ => DECIMAL256,
            };
            buffer.put_u8(tag);
            buffer.put_u8(*precision as u8);
            buffer.put_u8(*scale as u8);
        }
        Type::Enum8 { items } => {
            buffer.put_u8(ENUM8);
            write_varint(buffer, items.items().len() as u64);
            for item in items.items() {
                write_string(buffer, &item.name);
                buffer.put_i8(item.value as i8);
            }
        }
        Type::Enum16 { items } => {
            buffer.put_u8(ENUM16);
            write_varint(buffer, items.items().len() as u64);
            for item in items.items() {
                write_string(buffer, &item.name);
                buffer.put_i16_le(item.value);
            }
        }
        Type::Array { item_type } => {
            buffer.put_u8(ARRAY);
            encode_binary_type(item_type, buffer)?;
        }
        Type::Nullable { nested_type } => {
            buffer.put_u8(NULLABLE);
            encode_binary_type(nested_type, buffer)?;
        }
        Type::LowCardinality { nested_type } => {
            buffer.put_u8(LOW_CARDINALITY);
            encode_binary_type(nested_type, buffer)?;
        }
        Type::SimpleAggregateFunction { nested_type, .. } => {
            encode_binary_type(nested_type, buffer)?;
        }
        Type::Tuple { item_types, item_names } => match item_names {
            Some(names) => {
                buffer.put_u8(NAMED_TUPLE);
                let fields: Vec<(&str, &Type)> =
                    names.iter().map(String::as_str).zip(item_types).collect();
                write_named_types(buffer, &fields)?;
            }
            None => {
                buffer.put_u8(TUPLE);
                write_varint(buffer, item_types.len() as u64);
                for item in item_types {
                    encode_binary_type(item, buffer)?;
                }
            }
        },
        Type::Nested { fields } => {
            buffer.put_u8(NESTED);
            let fields: Vec<(&str, &Type)> =
                fields.iter().map(|(n, t)| (n.as_str(), t)).collect();
            write_named_types(buffer, &fields)?;
        }
        Type::Map { key_type, value_type } => {
            buffer.put_u8(MAP);
            encode_binary_type(key_type, buffer)?;
            encode_binary_type(value_type, buffer)?;
        }
        Type::Variant { variants } => {
            buffer.put_u8(VARIANT);
            write_varint(buffer, variants.len() as u64);
            for variant in variants {
                encode_binary_type(variant, buffer)?;
            }
        }
    }
    Ok(())
}
