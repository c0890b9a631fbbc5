//! Enum8 and Enum16 codecs.

use super::numeric::read_array;
use crate::{
    types::EnumItems,
    Error,
    Result,
    Value,
};
use bytes::{
    BufMut,
    BytesMut,
};
use num_traits::ToPrimitive;

/// Code for a symbol or a numeric code present in the table.
pub(crate) fn enum_code(items: &EnumItems, type_name: &str, value: &Value) -> Result<i16> {
    let code = match value {
        Value::String(symbol) => items.value_of(symbol).ok_or_else(|| {
            Error::EnumLookup(format!("'{}' is not a member of {}", symbol, type_name))
        })?,
        other => {
            let number = other.as_bigint().ok_or_else(|| {
                Error::UnsupportedConversion(format!(
                    "Cannot convert {} to {}",
                    other.kind(),
                    type_name
                ))
            })?;
            number
                .to_i16()
                .filter(|code| items.contains_value(*code))
                .ok_or_else(|| {
                    Error::EnumLookup(format!("{} is not a code of {}", number, type_name))
                })?
        }
    };
    Ok(code)
}

/// Symbol for a symbol or a numeric code present in the table.
pub(crate) fn enum_symbol<'a>(
    items: &'a EnumItems,
    type_name: &str,
    value: &Value,
) -> Result<&'a str> {
    let code = enum_code(items, type_name, value)?;
    items
        .name_of(code)
        .ok_or_else(|| Error::EnumLookup(format!("{} is not a code of {}", code, type_name)))
}

fn lookup(items: &EnumItems, code: i16, type_name: &str) -> Result<Value> {
    items
        .name_of(code)
        .map(|name| Value::String(name.to_string()))
        .ok_or_else(|| Error::EnumLookup(format!("Unknown {} code {}", type_name, code)))
}

pub(crate) fn decode_enum8(items: &EnumItems, buffer: &mut &[u8]) -> Result<Value> {
    let code = i8::from_le_bytes(read_array(buffer, "Enum8")?);
    lookup(items, code as i16, "Enum8")
}

pub(crate) fn encode_enum8(items: &EnumItems, buffer: &mut BytesMut, value: &Value) -> Result<()> {
    let code = enum_code(items, "Enum8", value)?;
    let code = i8::try_from(code).map_err(|_| Error::overflow("Enum8", code))?;
    buffer.put_i8(code);
    Ok(())
}

pub(crate) fn decode_enum16(items: &EnumItems, buffer: &mut &[u8]) -> Result<Value> {
    let code = i16::from_le_bytes(read_array(buffer, "Enum16")?);
    lookup(items, code, "Enum16")
}

pub(crate) fn encode_enum16(items: &EnumItems, buffer: &mut BytesMut, value: &Value) -> Result<()> {
    buffer.put_i16_le(enum_code(items, "Enum16", value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EnumItem;

    fn items() -> EnumItems {
        EnumItems::new(vec![
            EnumItem { name: "red".to_string(), value: 1 },
            EnumItem { name: "blue".to_string(), value: -2 },
        ])
        .unwrap()
    }

    #[test]
    fn test_symbol_and_code() {
        let items = items();
        let mut buffer = BytesMut::new();
        encode_enum8(&items, &mut buffer, &Value::from("blue")).unwrap();
        encode_enum8(&items, &mut buffer, &Value::Int32(1)).unwrap();
        assert_eq!(&buffer[..], &[0xFE, 0x01]);

        let mut slice = &buffer[..];
        assert_eq!(decode_enum8(&items, &mut slice).unwrap(), Value::from("blue"));
        assert_eq!(decode_enum8(&items, &mut slice).unwrap(), Value::from("red"));
    }

    #[test]
    fn test_unmapped_values() {
        let items = items();
        let mut buffer = BytesMut::new();
        assert!(matches!(
            encode_enum16(&items, &mut buffer, &Value::from("green")),
            Err(Error::EnumLookup(_))
        ));
        assert!(matches!(
            encode_enum16(&items, &mut buffer, &Value::Int64(5)),
            Err(Error::EnumLookup(_))
        ));

        let mut slice: &[u8] = &[7];
        assert!(matches!(decode_enum8(&items, &mut slice), Err(Error::EnumLookup(_))));
    }
}
