//! Array, Nullable, Tuple, Nested, Map and Variant codecs.
//!
//! Element values go through [`decode_value`]/[`encode_value`] so any type
//! can be nested in any container.

use super::{
    decode_value,
    dynamic::infer_type,
    encode_value,
    numeric::read_array,
};
use crate::{
    io::buffer_utils::{
        read_length,
        write_varint,
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

/// Variant discriminator of a NULL value.
pub const NULL_DISCRIMINATOR: u8 = 255;

fn unsupported(type_name: impl std::fmt::Display, value: &Value) -> Error {
    Error::UnsupportedConversion(format!("Cannot convert {} to {}", value.kind(), type_name))
}

/// Elements of an array value.
pub(crate) fn array_items<'a>(ty: &Type, value: &'a Value) -> Result<&'a [Value]> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(unsupported(ty, other)),
    }
}

/// Elements of a tuple value in declaration order.
///
/// Tuples and arrays are taken positionally; a map with string keys is
/// matched against the element names of a named tuple.
pub(crate) fn tuple_elements<'a>(
    type_name: &dyn std::fmt::Display,
    item_types: &[Type],
    item_names: Option<&[String]>,
    value: &'a Value,
) -> Result<Vec<&'a Value>> {
    let elements: Vec<&Value> = match (value, item_names) {
        (Value::Tuple(items) | Value::Array(items), _) => items.iter().collect(),
        (Value::Map(entries), Some(names)) => names
            .iter()
            .map(|name| {
                entries
                    .iter()
                    .find(|(k, _)| k.as_str() == Some(name.as_str()))
                    .map(|(_, v)| v)
                    .ok_or_else(|| {
                        Error::UnsupportedConversion(format!(
                            "Missing element '{}' for {}",
                            name, type_name
                        ))
                    })
            })
            .collect::<Result<_>>()?,
        (other, _) => return Err(unsupported(type_name, other)),
    };
    if elements.len() != item_types.len() {
        return Err(Error::UnsupportedConversion(format!(
            "{} expects {} elements, got {}",
            type_name,
            item_types.len(),
            elements.len()
        )));
    }
    Ok(elements)
}

pub(crate) fn decode_array(
    item_type: &Type,
    buffer: &mut &[u8],
    nesting: usize,
) -> Result<Value> {
    let count = read_length(buffer)?;
    let mut items = Vec::with_capacity(count.min(buffer.len()));
    for _ in 0..count {
        items.push(decode_value(item_type, buffer, nesting)?);
    }
    Ok(Value::Array(items))
}

pub(crate) fn encode_array(ty: &Type, item_type: &Type, buffer: &mut BytesMut, value: &Value) -> Result<()> {
    let items = array_items(ty, value)?;
    write_varint(buffer, items.len() as u64);
    for item in items {
        encode_value(item_type, buffer, item)?;
    }
    Ok(())
}

pub(crate) fn decode_nullable(
    nested_type: &Type,
    buffer: &mut &[u8],
    nesting: usize,
) -> Result<Value> {
    match read_array::<1>(buffer, "Nullable flag")? {
        [0] => decode_value(nested_type, buffer, nesting),
        [1] => Ok(Value::Null),
        [flag] => Err(Error::DecodingFormat(format!("Invalid Nullable flag {}", flag))),
    }
}

pub(crate) fn encode_nullable(nested_type: &Type, buffer: &mut BytesMut, value: &Value) -> Result<()> {
    if value.is_null() {
        buffer.put_u8(1);
        return Ok(());
    }
    buffer.put_u8(0);
    encode_value(nested_type, buffer, value)
}

pub(crate) fn decode_tuple(
    item_types: &[Type],
    buffer: &mut &[u8],
    nesting: usize,
) -> Result<Value> {
    let items = item_types
        .iter()
        .map(|item_type| decode_value(item_type, buffer, nesting))
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Tuple(items))
}

pub(crate) fn encode_tuple(
    ty: &Type,
    item_types: &[Type],
    item_names: Option<&[String]>,
    buffer: &mut BytesMut,
    value: &Value,
) -> Result<()> {
    let elements = tuple_elements(ty, item_types, item_names, value)?;
    for (item_type, element) in item_types.iter().zip(elements) {
        encode_value(item_type, buffer, element)?;
    }
    Ok(())
}

pub(crate) fn decode_nested(
    fields: &[(String, Type)],
    buffer: &mut &[u8],
    nesting: usize,
) -> Result<Value> {
    let count = read_length(buffer)?;
    let mut rows = Vec::with_capacity(count.min(buffer.len()));
    for _ in 0..count {
        let row = fields
            .iter()
            .map(|(_, field_type)| decode_value(field_type, buffer, nesting))
            .collect::<Result<Vec<_>>>()?;
        rows.push(Value::Tuple(row));
    }
    Ok(Value::Array(rows))
}

/// NULL encodes as an empty array of rows.
pub(crate) fn encode_nested(
    ty: &Type,
    fields: &[(String, Type)],
    buffer: &mut BytesMut,
    value: &Value,
) -> Result<()> {
    if value.is_null() {
        write_varint(buffer, 0);
        return Ok(());
    }
    let rows = array_items(ty, value)?;
    let types: Vec<Type> = fields.iter().map(|(_, t)| t.clone()).collect();
    let names: Vec<String> = fields.iter().map(|(n, _)| n.clone()).collect();

    write_varint(buffer, rows.len() as u64);
    for row in rows {
        let elements = tuple_elements(ty, &types, Some(names.as_slice()), row)?;
        for (field_type, element) in types.iter().zip(elements) {
            encode_value(field_type, buffer, element)?;
        }
    }
    Ok(())
}

pub(crate) fn decode_map(
    key_type: &Type,
    value_type: &Type,
    buffer: &mut &[u8],
    nesting: usize,
) -> Result<Value> {
    let count = read_length(buffer)?;
    let mut entries = Vec::with_capacity(count.min(buffer.len()));
    for _ in 0..count {
        let key = decode_value(key_type, buffer, nesting)?;
        let value = decode_value(value_type, buffer, nesting)?;
        entries.push((key, value));
    }
    Ok(Value::Map(entries))
}

pub(crate) fn encode_map(
    ty: &Type,
    key_type: &Type,
    value_type: &Type,
    buffer: &mut BytesMut,
    value: &Value,
) -> Result<()> {
    let entries = match value {
        Value::Map(entries) => entries,
        other => return Err(unsupported(ty, other)),
    };
    write_varint(buffer, entries.len() as u64);
    for (k, v) in entries {
        encode_value(key_type, buffer, k)?;
        encode_value(value_type, buffer, v)?;
    }
    Ok(())
}

pub(crate) fn decode_variant(
    variants: &[Type],
    buffer: &mut &[u8],
    nesting: usize,
) -> Result<Value> {
    let [discriminator] = read_array::<1>(buffer, "Variant discriminator")?;
    if discriminator == NULL_DISCRIMINATOR {
        return Ok(Value::Null);
    }
    let variant = variants.get(discriminator as usize).ok_or_else(|| {
        Error::DecodingFormat(format!(
            "Variant discriminator {} out of range for {} variants",
            discriminator,
            variants.len()
        ))
    })?;
    decode_value(variant, buffer, nesting)
}

/// Index of the variant `value` is written as, and its encoded bytes.
///
/// A variant whose type matches the value's own type wins; otherwise the
/// first variant that accepts the value is used.
pub(crate) fn select_variant(variants: &[Type], value: &Value) -> Result<(usize, BytesMut)> {
    let mut scratch = BytesMut::new();

    if let Ok(natural) = infer_type(value) {
        if let Some(index) = variants.iter().position(|v| *v == natural) {
            encode_value(&variants[index], &mut scratch, value)?;
            return Ok((index, scratch));
        }
    }

    for (index, variant) in variants.iter().enumerate() {
        scratch.clear();
        if encode_value(variant, &mut scratch, value).is_ok() {
            return Ok((index, scratch));
        }
    }

    let names: Vec<String> = variants.iter().map(Type::name).collect();
    Err(Error::UnsupportedConversion(format!(
        "No variant of Variant({}) accepts {}",
        names.join(", "),
        value.kind()
    )))
}

pub(crate) fn encode_variant(variants: &[Type], buffer: &mut BytesMut, value: &Value) -> Result<()> {
    if value.is_null() {
        buffer.put_u8(NULL_DISCRIMINATOR);
        return Ok(());
    }
    let (index, bytes) = select_variant(variants, value)?;
    buffer.put_u8(index as u8);
    buffer.extend_from_slice(&bytes);
    Ok(())
}
