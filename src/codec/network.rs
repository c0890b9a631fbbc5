//! UUID, IPv4 and IPv6 codecs.
//!
//! UUID is written as two little-endian u64 halves, high half first. IPv4 is
//! a little-endian u32; IPv6 is 16 bytes in network order.

use super::numeric::read_array;
use crate::{
    Error,
    Result,
    Value,
};
use bytes::{
    BufMut,
    BytesMut,
};
use std::net::{
    IpAddr,
    Ipv4Addr,
    Ipv6Addr,
};
use uuid::Uuid;

fn invalid(type_name: &str, value: &Value) -> Error {
    match value {
        Value::String(s) => {
            Error::UnsupportedConversion(format!("'{}' is not a valid {}", s, type_name))
        }
        other => Error::UnsupportedConversion(format!(
            "Cannot convert {} to {}",
            other.kind(),
            type_name
        )),
    }
}

pub(crate) fn coerce_uuid(value: &Value) -> Result<Uuid> {
    match value {
        Value::Uuid(uuid) => Ok(*uuid),
        Value::String(s) => Uuid::parse_str(s.trim()).map_err(|_| invalid("UUID", value)),
        Value::Bytes(b) => Uuid::from_slice(b).map_err(|_| invalid("UUID", value)),
        other => Err(invalid("UUID", other)),
    }
}

pub(crate) fn decode_uuid(buffer: &mut &[u8]) -> Result<Value> {
    let high = u64::from_le_bytes(read_array(buffer, "UUID")?);
    let low = u64::from_le_bytes(read_array(buffer, "UUID")?);
    Ok(Value::Uuid(Uuid::from_u64_pair(high, low)))
}

pub(crate) fn encode_uuid(buffer: &mut BytesMut, value: &Value) -> Result<()> {
    let (high, low) = coerce_uuid(value)?.as_u64_pair();
    buffer.put_u64_le(high);
    buffer.put_u64_le(low);
    Ok(())
}

pub(crate) fn coerce_ipv4(value: &Value) -> Result<Ipv4Addr> {
    match value {
        Value::Ipv4(addr) => Ok(*addr),
        Value::Ipv6(addr) => addr.to_ipv4_mapped().ok_or_else(|| invalid("IPv4", value)),
        Value::String(s) => s.trim().parse().map_err(|_| invalid("IPv4", value)),
        Value::UInt32(v) => Ok(Ipv4Addr::from(*v)),
        other => Err(invalid("IPv4", other)),
    }
}

pub(crate) fn decode_ipv4(buffer: &mut &[u8]) -> Result<Value> {
    Ok(Value::Ipv4(Ipv4Addr::from(u32::from_le_bytes(read_array(buffer, "IPv4")?))))
}

pub(crate) fn encode_ipv4(buffer: &mut BytesMut, value: &Value) -> Result<()> {
    buffer.put_u32_le(u32::from(coerce_ipv4(value)?));
    Ok(())
}

/// IPv4 addresses are accepted and stored in their IPv4-mapped form.
pub(crate) fn coerce_ipv6(value: &Value) -> Result<Ipv6Addr> {
    match value {
        Value::Ipv6(addr) => Ok(*addr),
        Value::Ipv4(addr) => Ok(addr.to_ipv6_mapped()),
        Value::String(s) => match s.trim().parse::<IpAddr>() {
            Ok(IpAddr::V6(addr)) => Ok(addr),
            Ok(IpAddr::V4(addr)) => Ok(addr.to_ipv6_mapped()),
            Err(_) => Err(invalid("IPv6", value)),
        },
        other => Err(invalid("IPv6", other)),
    }
}

pub(crate) fn decode_ipv6(buffer: &mut &[u8]) -> Result<Value> {
    Ok(Value::Ipv6(Ipv6Addr::from(read_array::<16>(buffer, "IPv6")?)))
}

pub(crate) fn encode_ipv6(buffer: &mut BytesMut, value: &Value) -> Result<()> {
    buffer.put_slice(&coerce_ipv6(value)?.octets());
    Ok(())
}
