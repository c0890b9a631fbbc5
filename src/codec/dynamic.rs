//! Dynamic and JSON codecs.
//!
//! A Dynamic value is its binary-encoded type followed by the value in that
//! type. A JSON object is a count of paths, then for every leaf a dotted
//! path and a Dynamic-style typed value. Objects are flattened on write and
//! rebuilt on read.

use super::{
    decode_value,
    encode_value,
};
use crate::{
    io::buffer_utils::{
        read_length,
        read_string,
        write_string,
        write_varint,
    },
    numeric::ClickHouseDecimal,
    types::{
        binary::{
            decode_binary_type,
            encode_binary_type,
            NOTHING,
        },
        parser::MAX_DEPTH,
        TimeZone,
        Type,
        TypeCode,
        MAX_DECIMAL_PRECISION,
    },
    Error,
    Result,
    Value,
};
use bytes::{
    BufMut,
    BytesMut,
};
use chrono::Timelike;
use serde_json::{
    Map as JsonMap,
    Value as Json,
};

fn decimal_type(decimal: &ClickHouseDecimal) -> Result<Type> {
    let digits = decimal.precision().max(decimal.scale()).max(1);
    let precision = match digits {
        0..=9 => 9,
        10..=18 => 18,
        19..=38 => 38,
        _ => MAX_DECIMAL_PRECISION,
    };
    if digits > MAX_DECIMAL_PRECISION {
        return Err(Error::overflow("Decimal256", decimal));
    }
    Ok(Type::decimal(precision, decimal.scale()))
}

fn infer_element_type(items: &[Value]) -> Result<Type> {
    let inner = match items.iter().find(|v| !v.is_null()) {
        Some(first) => infer_type(first)?,
        None => Type::nothing(),
    };
    if items.iter().any(Value::is_null) && !inner.is_nullable() {
        Ok(Type::nullable(inner))
    } else {
        Ok(inner)
    }
}

/// The ClickHouse type a value is written as when no column type is given.
pub(crate) fn infer_type(value: &Value) -> Result<Type> {
    Ok(match value {
        Value::Null => Type::nothing(),
        Value::Bool(_) => Type::bool(),
        Value::Int8(_) => Type::int8(),
        Value::Int16(_) => Type::int16(),
        Value::Int32(_) => Type::int32(),
        Value::Int64(_) => Type::int64(),
        Value::Int128(_) => Type::int128(),
        Value::Int256(_) => Type::int256(),
        Value::UInt8(_) => Type::uint8(),
        Value::UInt16(_) => Type::uint16(),
        Value::UInt32(_) => Type::uint32(),
        Value::UInt64(_) => Type::uint64(),
        Value::UInt128(_) => Type::uint128(),
        Value::UInt256(_) => Type::uint256(),
        Value::Float32(_) => Type::float32(),
        Value::Float64(_) => Type::float64(),
        Value::Decimal(d) => decimal_type(d)?,
        Value::NativeDecimal(d) => decimal_type(&ClickHouseDecimal::from(*d))?,
        Value::String(_) | Value::Bytes(_) => Type::string(),
        Value::Uuid(_) => Type::uuid(),
        Value::Date(_) => Type::date(),
        Value::DateTime(dt) => {
            let timezone = TimeZone::Explicit(dt.timezone());
            if dt.nanosecond() == 0 {
                Type::DateTime { timezone }
            } else {
                Type::DateTime64 { precision: 9, timezone }
            }
        }
        Value::NaiveDateTime(dt) => {
            if dt.nanosecond() == 0 {
                Type::datetime(None)
            } else {
                Type::datetime64(9, None)?
            }
        }
        Value::Ipv4(_) => Type::ipv4(),
        Value::Ipv6(_) => Type::ipv6(),
        Value::Array(items) => Type::array(infer_element_type(items)?),
        Value::Tuple(items) => {
            Type::tuple(items.iter().map(infer_type).collect::<Result<Vec<_>>>()?)
        }
        Value::Map(entries) => {
            let keys: Vec<Value> = entries.iter().map(|(k, _)| k.clone()).collect();
            let values: Vec<Value> = entries.iter().map(|(_, v)| v.clone()).collect();
            Type::map(infer_element_type(&keys)?, infer_element_type(&values)?)
        }
        Value::Json(_) => Type::json(),
    })
}

fn check_nesting(nesting: usize) -> Result<()> {
    if nesting > MAX_DEPTH {
        return Err(Error::DecodingFormat(
            "Dynamic or JSON values are nested too deeply".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn decode_dynamic(buffer: &mut &[u8], nesting: usize) -> Result<Value> {
    check_nesting(nesting)?;
    let ty = decode_binary_type(buffer)?;
    if ty == Type::nothing() {
        return Ok(Value::Null);
    }
    decode_value(&ty, buffer, nesting + 1)
}

pub(crate) fn encode_dynamic(buffer: &mut BytesMut, value: &Value) -> Result<()> {
    if value.is_null() {
        buffer.put_u8(NOTHING);
        return Ok(());
    }
    let ty = infer_type(value)?;
    encode_binary_type(&ty, buffer)?;
    encode_value(&ty, buffer, value)
}

fn insert_path(root: &mut JsonMap<String, Json>, path: &str, value: Json) -> Result<()> {
    let mut parts: Vec<&str> = path.split('.').collect();
    let leaf = parts.pop().unwrap_or(path);

    let mut current = root;
    for part in parts {
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| Json::Object(JsonMap::new()));
        current = match entry {
            Json::Object(map) => map,
            _ => {
                return Err(Error::DecodingFormat(format!(
                    "JSON path {} conflicts with a scalar at {}",
                    path, part
                )))
            }
        };
    }
    current.insert(leaf.to_string(), value);
    Ok(())
}

pub(crate) fn decode_json(buffer: &mut &[u8], nesting: usize) -> Result<Value> {
    check_nesting(nesting)?;
    let count = read_length(buffer)?;
    let mut root = JsonMap::new();
    for _ in 0..count {
        let path = read_string(buffer)?;
        let value = decode_dynamic(buffer, nesting + 1)?.to_json();
        insert_path(&mut root, &path, value)?;
    }
    Ok(Value::Json(Json::Object(root)))
}

/// The object a value stands for: JSON, JSON text, or a map with string
/// keys.
fn json_object(value: &Value) -> Result<JsonMap<String, Json>> {
    let json = match value {
        Value::Json(json) => json.clone(),
        Value::String(text) => serde_json::from_str(text)
            .map_err(|e| Error::UnsupportedConversion(format!("Invalid JSON text: {}", e)))?,
        Value::Map(_) => value.to_json(),
        other => {
            return Err(Error::UnsupportedConversion(format!(
                "Cannot convert {} to JSON",
                other.kind()
            )))
        }
    };
    match json {
        Json::Object(map) => Ok(map),
        other => Err(Error::UnsupportedConversion(format!(
            "JSON value must be an object, got {}",
            other
        ))),
    }
}

fn flatten<'a>(prefix: &str, object: &'a JsonMap<String, Json>, out: &mut Vec<(String, &'a Json)>) {
    for (key, value) in object {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Json::Object(child) => flatten(&path, child, out),
            leaf => out.push((path, leaf)),
        }
    }
}

fn json_number_type(number: &serde_json::Number) -> Type {
    if number.is_i64() {
        Type::int64()
    } else if number.is_u64() {
        Type::uint64()
    } else {
        Type::float64()
    }
}

fn unify_numbers(a: &Type, b: &Type) -> Option<Type> {
    let numeric = [Type::int64(), Type::uint64(), Type::float64()];
    if numeric.contains(a) && numeric.contains(b) {
        Some(if a == b { a.clone() } else { Type::float64() })
    } else {
        None
    }
}

/// Type of a leaf that is not an object.
fn json_leaf_type(json: &Json) -> Result<Type> {
    Ok(match json {
        Json::Null => Type::nothing(),
        Json::Bool(_) => Type::bool(),
        Json::Number(n) => json_number_type(n),
        Json::String(_) => Type::string(),
        Json::Array(items) => {
            let mut element: Option<Type> = None;
            let mut has_null = false;
            for item in items {
                if item.is_null() {
                    has_null = true;
                    continue;
                }
                let item_type = json_leaf_type(item)?;
                element = Some(match element {
                    None => item_type,
                    Some(current) if current == item_type => current,
                    Some(current) => unify_numbers(&current, &item_type).ok_or_else(|| {
                        Error::UnsupportedConversion(
                            "JSON array contains mixed value types".to_string(),
                        )
                    })?,
                });
            }
            let element = match element {
                Some(t) if has_null => {
                    if t.code() == TypeCode::Array {
                        return Err(Error::UnsupportedConversion(
                            "JSON array mixes nulls and arrays".to_string(),
                        ));
                    }
                    Type::nullable(t)
                }
                Some(t) => t,
                None => Type::nothing(),
            };
            Type::array(element)
        }
        Json::Object(_) => {
            return Err(Error::UnsupportedConversion(
                "JSON objects inside arrays are not supported".to_string(),
            ))
        }
    })
}

fn json_to_value(json: &Json, ty: &Type) -> Result<Value> {
    let mismatch = || Error::UnsupportedConversion(format!("Cannot convert {} to {}", json, ty));
    Ok(match (ty, json) {
        (_, Json::Null) => Value::Null,
        (Type::Nullable { nested_type }, _) => json_to_value(json, nested_type)?,
        (Type::Simple(TypeCode::Bool), Json::Bool(b)) => Value::Bool(*b),
        (Type::Simple(TypeCode::Int64), Json::Number(n)) => {
            Value::Int64(n.as_i64().ok_or_else(mismatch)?)
        }
        (Type::Simple(TypeCode::UInt64), Json::Number(n)) => {
            Value::UInt64(n.as_u64().ok_or_else(mismatch)?)
        }
        (Type::Simple(TypeCode::Float64), Json::Number(n)) => {
            Value::Float64(n.as_f64().ok_or_else(mismatch)?)
        }
        (Type::Simple(TypeCode::String), Json::String(s)) => Value::String(s.clone()),
        (Type::Array { item_type }, Json::Array(items)) => Value::Array(
            items
                .iter()
                .map(|item| json_to_value(item, item_type))
                .collect::<Result<Vec<_>>>()?,
        ),
        _ => return Err(mismatch()),
    })
}

pub(crate) fn encode_json(buffer: &mut BytesMut, value: &Value) -> Result<()> {
    let object = json_object(value)?;
    let mut leaves = Vec::new();
    flatten("", &object, &mut leaves);

    write_varint(buffer, leaves.len() as u64);
    for (path, leaf) in leaves {
        write_string(buffer, &path);
        let ty = json_leaf_type(leaf)?;
        encode_binary_type(&ty, buffer)?;
        encode_value(&ty, buffer, &json_to_value(leaf, &ty)?)?;
    }
    Ok(())
}

/// JSON text of a value written to a JSON column.
pub(crate) fn json_text(value: &Value) -> Result<String> {
    Ok(Json::Object(json_object(value)?).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::binary::{
        DYNAMIC,
        UINT8,
    };
    use serde_json::json;

    fn roundtrip_json(input: Json) -> Json {
        let mut buffer = BytesMut::new();
        encode_json(&mut buffer, &Value::Json(input)).unwrap();
        let mut slice = &buffer[..];
        let decoded = decode_json(&mut slice, 0).unwrap();
        assert!(slice.is_empty());
        match decoded {
            Value::Json(json) => json,
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_infer_types() {
        assert_eq!(infer_type(&Value::Int32(1)).unwrap(), Type::int32());
        assert_eq!(
            infer_type(&Value::Array(vec![Value::Null, Value::from("a")])).unwrap(),
            Type::array(Type::nullable(Type::string()))
        );
        assert_eq!(infer_type(&Value::Array(vec![])).unwrap(), Type::array(Type::nothing()));
        assert_eq!(
            infer_type(&Value::Decimal("123.45".parse().unwrap())).unwrap(),
            Type::decimal(9, 2)
        );
    }

    #[test]
    fn test_dynamic_roundtrip() {
        for value in [
            Value::Null,
            Value::UInt64(42),
            Value::from("text"),
            Value::Array(vec![Value::Int16(1), Value::Null]),
            Value::Decimal("-0.005".parse().unwrap()),
        ] {
            let mut buffer = BytesMut::new();
            encode_dynamic(&mut buffer, &value).unwrap();
            let mut slice = &buffer[..];
            assert_eq!(decode_dynamic(&mut slice, 0).unwrap(), value);
            assert!(slice.is_empty());
        }
    }

    #[test]
    fn test_dynamic_wire_layout() {
        let mut buffer = BytesMut::new();
        encode_dynamic(&mut buffer, &Value::Int64(-1)).unwrap();
        assert_eq!(&buffer[..], &[0x0A, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_json_roundtrip() {
        let input = json!({
            "id": 1,
            "name": "x",
            "nested": {"flag": true, "score": 1.5, "deep": {"n": -3}},
            "tags": ["a", "b"],
            "missing": null
        });
        assert_eq!(roundtrip_json(input.clone()), input);
    }

    #[test]
    fn test_json_mixed_numbers_widen() {
        let output = roundtrip_json(json!({"mixed": [1, 2.5], "nullable": [1, null]}));
        assert_eq!(output, json!({"mixed": [1.0, 2.5], "nullable": [1, null]}));
    }

    #[test]
    fn test_json_from_text() {
        let mut buffer = BytesMut::new();
        encode_json(&mut buffer, &Value::from(r#"{"a": {"b": 2}}"#)).unwrap();
        let mut slice = &buffer[..];
        assert_eq!(decode_json(&mut slice, 0).unwrap(), Value::Json(json!({"a": {"b": 2}})));
    }

    #[test]
    fn test_json_rejects_unsupported_shapes() {
        let mut buffer = BytesMut::new();
        for input in [json!({"a": [1, "x"]}), json!({"a": [{"b": 1}]}), json!([1, 2])] {
            assert!(matches!(
                encode_json(&mut buffer, &Value::Json(input)),
                Err(Error::UnsupportedConversion(_))
            ));
        }
    }

    #[test]
    fn test_self_described_nesting_is_bounded() {
        // Every level is a Dynamic value whose type is Dynamic again.
        let mut deep = Vec::new();
        for _ in 0..100_000 {
            deep.extend_from_slice(&[DYNAMIC, 32]);
        }
        deep.push(NOTHING);
        let mut slice = &deep[..];
        assert!(matches!(decode_dynamic(&mut slice, 0), Err(Error::DecodingFormat(_))));

        let mut shallow = Vec::new();
        for _ in 0..10 {
            shallow.extend_from_slice(&[DYNAMIC, 32]);
        }
        shallow.extend_from_slice(&[UINT8, 7]);
        let mut slice = &shallow[..];
        assert_eq!(decode_dynamic(&mut slice, 0).unwrap(), Value::UInt8(7));
    }

    #[test]
    fn test_json_path_with_nested_json_is_bounded() {
        // One path whose value is itself a JSON object with one path, repeated.
        let mut level = Vec::new();
        level.push(1);
        write_string_to(&mut level, "a");
        let mut json_type = BytesMut::new();
        encode_binary_type(&Type::json(), &mut json_type).unwrap();
        level.extend_from_slice(&json_type);

        let mut deep = Vec::new();
        for _ in 0..10_000 {
            deep.extend_from_slice(&level);
        }
        deep.push(0);
        let mut slice = &deep[..];
        assert!(matches!(decode_json(&mut slice, 0), Err(Error::DecodingFormat(_))));
    }

    fn write_string_to(out: &mut Vec<u8>, s: &str) {
        out.push(s.len() as u8);
        out.extend_from_slice(s.as_bytes());
    }
}
