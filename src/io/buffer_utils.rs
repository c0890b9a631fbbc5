//! Buffer utilities for LEB128 varints, length-prefixed strings and bounded
//! reads.
//!
//! Readers take `&mut &[u8]` and advance the slice past what they consume,
//! so a caller always knows exactly how many bytes a value occupied.

use crate::{
    Error,
    Result,
};
use bytes::{
    Buf,
    BufMut,
    BytesMut,
};

/// Read a LEB128-encoded u64 from a byte slice
pub fn read_varint(buffer: &mut &[u8]) -> Result<u64> {
    let mut result: u64 = 0;
    let mut shift = 0;

    loop {
        if buffer.is_empty() {
            return Err(Error::DecodingFormat(
                "Unexpected end of buffer reading varint".to_string(),
            ));
        }

        let byte = buffer[0];
        buffer.advance(1);

        result |= ((byte & 0x7F) as u64) << shift;

        if byte & 0x80 == 0 {
            break;
        }

        shift += 7;
        if shift >= 64 {
            return Err(Error::DecodingFormat("Varint overflow".to_string()));
        }
    }

    Ok(result)
}

/// Write a LEB128-encoded u64 to a byte buffer
pub fn write_varint(buffer: &mut BytesMut, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;

        if value != 0 {
            byte |= 0x80;
        }

        buffer.put_u8(byte);

        if value == 0 {
            break;
        }
    }
}

/// Read a varint length prefix, e.g. an array element count.
pub fn read_length(buffer: &mut &[u8]) -> Result<usize> {
    let len = read_varint(buffer)?;
    usize::try_from(len).map_err(|_| {
        Error::DecodingFormat(format!("Length prefix {} is too large", len))
    })
}

/// Fail unless `buffer` holds at least `len` more bytes.
pub fn ensure_remaining(buffer: &[u8], len: usize, what: &str) -> Result<()> {
    if buffer.len() < len {
        return Err(Error::DecodingFormat(format!(
            "Not enough data for {}: need {}, have {}",
            what,
            len,
            buffer.len()
        )));
    }
    Ok(())
}

/// Split `len` bytes off the front of the slice.
pub fn read_bytes<'a>(
    buffer: &mut &'a [u8],
    len: usize,
    what: &str,
) -> Result<&'a [u8]> {
    ensure_remaining(buffer, len, what)?;
    let (head, tail) = buffer.split_at(len);
    *buffer = tail;
    Ok(head)
}

/// Read a length-prefixed byte string without UTF-8 validation
pub fn read_string_bytes<'a>(buffer: &mut &'a [u8]) -> Result<&'a [u8]> {
    let len = read_length(buffer)?;
    read_bytes(buffer, len, "string")
}

/// Read a length-prefixed UTF-8 string
pub fn read_string(buffer: &mut &[u8]) -> Result<String> {
    let data = read_string_bytes(buffer)?;
    String::from_utf8(data.to_vec()).map_err(|e| {
        Error::DecodingFormat(format!("Invalid UTF-8 in string: {}", e))
    })
}

/// Write a length-prefixed byte string
pub fn write_bytes(buffer: &mut BytesMut, data: &[u8]) {
    write_varint(buffer, data.len() as u64);
    buffer.put_slice(data);
}

/// Write a length-prefixed string
pub fn write_string(buffer: &mut BytesMut, s: &str) {
    write_bytes(buffer, s.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_roundtrip() {
        let test_cases =
            vec![0u64, 1, 127, 128, 255, 256, 65535, 65536, u64::MAX];

        for value in test_cases {
            let mut buf = BytesMut::new();
            write_varint(&mut buf, value);

            let mut slice = &buf[..];
            let decoded = read_varint(&mut slice).unwrap();

            assert_eq!(
                value, decoded,
                "Varint roundtrip failed for {}",
                value
            );
            assert!(slice.is_empty(), "Buffer should be fully consumed");
        }
    }

    #[test]
    fn test_varint_known_bytes() {
        let mut buf = BytesMut::new();
        write_varint(&mut buf, 300);
        assert_eq!(&buf[..], &[0xAC, 0x02]);
    }

    #[test]
    fn test_string_roundtrip() {
        let test_strings =
            vec!["", "hello", "мир", "🦀", "test\nwith\nnewlines"];

        for s in test_strings {
            let mut buf = BytesMut::new();
            write_string(&mut buf, s);

            let mut slice = &buf[..];
            let decoded = read_string(&mut slice).unwrap();

            assert_eq!(s, decoded, "String roundtrip failed for '{}'", s);
            assert!(slice.is_empty(), "Buffer should be fully consumed");
        }
    }

    #[test]
    fn test_varint_overflow() {
        let mut buf = BytesMut::new();
        for _ in 0..10 {
            buf.put_u8(0xFF);
        }

        let mut slice = &buf[..];
        let result = read_varint(&mut slice);
        assert!(matches!(result, Err(Error::DecodingFormat(_))));
    }

    #[test]
    fn test_string_truncated() {
        let mut buf = BytesMut::new();
        write_varint(&mut buf, 100);
        buf.put_slice(b"only10");

        let mut slice = &buf[..];
        let result = read_string(&mut slice);
        assert!(matches!(result, Err(Error::DecodingFormat(_))));
    }

    #[test]
    fn test_read_bytes_advances() {
        let data = [1u8, 2, 3, 4, 5];
        let mut slice = &data[..];
        let head = read_bytes(&mut slice, 2, "test").unwrap();
        assert_eq!(head, &[1, 2]);
        assert_eq!(slice, &[3, 4, 5]);
        assert!(read_bytes(&mut slice, 4, "test").is_err());
        assert_eq!(slice.len(), 3);
    }
}
