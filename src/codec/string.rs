//! String and FixedString codecs.
//!
//! Content that is not valid UTF-8 decodes to `Value::Bytes` so nothing is
//! lost. FixedString keeps its trailing NUL padding on decode.

use crate::{
    io::buffer_utils::{
        read_bytes,
        read_string_bytes,
        write_bytes,
    },
    Error,
    Result,
    Value,
};
use bytes::{
    BufMut,
    BytesMut,
};

fn text_or_bytes(data: &[u8]) -> Value {
    match std::str::from_utf8(data) {
        Ok(s) => Value::String(s.to_string()),
        Err(_) => Value::Bytes(data.to_vec()),
    }
}

/// Raw bytes of a string-like value.
pub(crate) fn string_bytes<'a>(type_name: &str, value: &'a Value) -> Result<&'a [u8]> {
    value.as_bytes().ok_or_else(|| {
        Error::UnsupportedConversion(format!(
            "Cannot convert {} to {}",
            value.kind(),
            type_name
        ))
    })
}

pub(crate) fn decode_string(buffer: &mut &[u8]) -> Result<Value> {
    Ok(text_or_bytes(read_string_bytes(buffer)?))
}

pub(crate) fn encode_string(buffer: &mut BytesMut, value: &Value) -> Result<()> {
    write_bytes(buffer, string_bytes("String", value)?);
    Ok(())
}

pub(crate) fn decode_fixed_string(size: usize, buffer: &mut &[u8]) -> Result<Value> {
    Ok(text_or_bytes(read_bytes(buffer, size, "FixedString")?))
}

pub(crate) fn encode_fixed_string(size: usize, buffer: &mut BytesMut, value: &Value) -> Result<()> {
    let type_name = format!("FixedString({})", size);
    let data = string_bytes(&type_name, value)?;
    if data.len() > size {
        return Err(Error::overflow(type_name, format!("{} bytes", data.len())));
    }
    buffer.put_slice(data);
    buffer.put_bytes(0, size - data.len());
    Ok(())
}
