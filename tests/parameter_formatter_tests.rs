// Parameter formatting tests: the same values rendered as inline SQL
// literals and as HTTP query parameters.

use chrono::NaiveDate;
use clickhouse_type_codec::{
    encode_query_parameter,
    query_parameter,
    Error,
    FormatMode,
    Int256,
    Type,
    Value,
};
use serde_json::json;
use std::net::{
    Ipv4Addr,
    Ipv6Addr,
};
use uuid::Uuid;

/// (literal, parameter) for one value.
fn both(type_str: &str, value: Value) -> (String, String) {
    let ty = Type::parse(type_str).expect(type_str);
    let literal = ty.format(&value, FormatMode::SqlLiteral).expect("literal");
    let parameter = ty.format(&value, FormatMode::QueryParameter).expect("parameter");
    (literal, parameter)
}

fn check(type_str: &str, value: Value, literal: &str, parameter: &str) {
    let (l, p) = both(type_str, value);
    assert_eq!(l, literal, "literal for {}", type_str);
    assert_eq!(p, parameter, "parameter for {}", type_str);
}

// ============================================================================
// Scalars
// ============================================================================

#[test]
fn test_integers() {
    check("Int8", Value::Int8(-128), "-128", "-128");
    check("UInt64", Value::UInt64(u64::MAX), "18446744073709551615", "18446744073709551615");
    check("Int256", Value::Int256(Int256::from(-5)), "toInt256('-5')", "-5");
    check(
        "UInt128",
        Value::from(1u128 << 100),
        "toUInt128('1267650600228229401496703205376')",
        "1267650600228229401496703205376",
    );
}

#[test]
fn test_floats_and_bool() {
    check("Float64", Value::Float64(-0.25), "-0.25", "-0.25");
    check("Float64", Value::Float64(f64::NAN), "nan", "nan");
    check("Float32", Value::Float32(f32::NEG_INFINITY), "-inf", "-inf");
    check("Bool", Value::Bool(true), "true", "true");
}

#[test]
fn test_strings() {
    check("String", Value::from("plain"), "'plain'", "plain");
    check("String", Value::from(r"back\slash"), r"'back\\slash'", r"back\\slash");
    check("FixedString(4)", Value::from("ab"), "'ab'", "ab");
    check("LowCardinality(String)", Value::from("x'y"), r"'x\'y'", r"x\'y");
}

#[test]
fn test_fixed_string_too_long() {
    let ty = Type::parse("FixedString(2)").unwrap();
    for mode in [FormatMode::SqlLiteral, FormatMode::QueryParameter] {
        assert!(matches!(
            ty.format(&Value::from("abc"), mode),
            Err(Error::EncodingOverflow { .. })
        ));
    }
}

#[test]
fn test_network_and_uuid() {
    let uuid = Uuid::parse_str("61f0c404-5cb3-11e7-907b-a6006ad3dba0").unwrap();
    check(
        "UUID",
        Value::Uuid(uuid),
        "toUUID('61f0c404-5cb3-11e7-907b-a6006ad3dba0')",
        "61f0c404-5cb3-11e7-907b-a6006ad3dba0",
    );
    check("IPv4", Value::Ipv4(Ipv4Addr::new(10, 0, 0, 1)), "toIPv4('10.0.0.1')", "10.0.0.1");
    check("IPv6", Value::Ipv6(Ipv6Addr::LOCALHOST), "toIPv6('::1')", "::1");
    check(
        "IPv6",
        Value::Ipv4(Ipv4Addr::new(1, 2, 3, 4)),
        "toIPv6('::ffff:1.2.3.4')",
        "::ffff:1.2.3.4",
    );
}

#[test]
fn test_enums_accept_symbol_or_code() {
    let ty = "Enum8('red' = 1, 'green' = 2)";
    check(ty, Value::from("green"), "'green'", "green");
    check(ty, Value::Int8(1), "'red'", "red");
    check("Enum16('big' = 1000)", Value::Int16(1000), "'big'", "big");
}

// ============================================================================
// Decimals and Temporal Values
// ============================================================================

#[test]
fn test_decimals() {
    check("Decimal(9, 2)", Value::from("1.5"), "toDecimal32('1.50', 2)", "1.50");
    check("Decimal(18, 0)", Value::Int64(-42), "toDecimal64('-42', 0)", "-42");
    check("Decimal(38, 3)", Value::Float64(0.125), "toDecimal128('0.125', 3)", "0.125");
    check("Decimal(9, 1)", Value::from("2.99"), "toDecimal32('2.9', 1)", "2.9");
}

#[test]
fn test_decimal_overflow() {
    let ty = Type::parse("Decimal(5, 2)").unwrap();
    for mode in [FormatMode::SqlLiteral, FormatMode::QueryParameter] {
        assert!(matches!(
            ty.format(&Value::from("12345.6"), mode),
            Err(Error::EncodingOverflow { .. })
        ));
    }
}

#[test]
fn test_dates() {
    let date = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();
    check("Date", Value::Date(date), "toDate('1999-12-31')", "1999-12-31");
    check("Date32", Value::from("1900-01-01"), "toDate32('1900-01-01')", "1900-01-01");
}

#[test]
fn test_datetimes() {
    check(
        "DateTime('UTC')",
        Value::Int64(0),
        "toDateTime('1970-01-01 00:00:00', 'UTC')",
        "1970-01-01 00:00:00",
    );
    check(
        "DateTime('Asia/Tokyo')",
        Value::from("2024-01-01T00:00:00Z"),
        "toDateTime('2024-01-01 09:00:00', 'Asia/Tokyo')",
        "2024-01-01 09:00:00",
    );
    check(
        "DateTime64(6, 'UTC')",
        Value::from("2024-05-06 07:08:09.5"),
        "toDateTime64('2024-05-06 07:08:09.500000', 6, 'UTC')",
        "2024-05-06 07:08:09.500000",
    );
}

// ============================================================================
// NULL Handling
// ============================================================================

#[test]
fn test_null_sentinels() {
    check("Nullable(Int32)", Value::Null, "null", "\\N");
    check("Nullable(Decimal(9, 2))", Value::Null, "null", "\\N");
    check("Array(Nullable(Int32))", Value::Array(vec![Value::Null]), "[null]", "[null]");
    check(
        "Tuple(Nullable(String), Int8)",
        Value::Tuple(vec![Value::Null, Value::Int8(1)]),
        "(null,1)",
        "(null,1)",
    );
}

// ============================================================================
// Containers
// ============================================================================

#[test]
fn test_arrays() {
    check("Array(UInt8)", Value::Array(vec![]), "[]", "[]");
    check(
        "Array(Array(String))",
        Value::Array(vec![Value::Array(vec![Value::from("a"), Value::from("b'")])]),
        r"[['a','b\'']]",
        r"[['a','b\'']]",
    );
    check(
        "Array(Date)",
        Value::Array(vec![Value::from("2020-02-02")]),
        "[toDate('2020-02-02')]",
        "['2020-02-02']",
    );
}

#[test]
fn test_tuples() {
    check("Tuple(String)", Value::Tuple(vec![Value::from("x")]), "tuple('x')", "('x')");
    check(
        "Tuple(a Int32, b Decimal(9, 1))",
        Value::Tuple(vec![Value::Int32(3), Value::from("0.5")]),
        "(3,toDecimal32('0.5', 1))",
        "(3,0.5)",
    );
}

#[test]
fn test_maps() {
    let map = Value::Map(vec![
        (Value::from("a"), Value::Array(vec![Value::UInt16(1)])),
        (Value::from("b"), Value::Array(vec![])),
    ]);
    check("Map(String, Array(UInt16))", map, "{'a':[1],'b':[]}", "{'a':[1],'b':[]}");
    check("Map(UInt8, String)", Value::Map(vec![]), "{}", "{}");
}

#[test]
fn test_nested_rows() {
    let rows = Value::Array(vec![
        Value::Tuple(vec![Value::UInt32(1), Value::from("one")]),
        Value::Tuple(vec![Value::UInt32(2), Value::from("two")]),
    ]);
    check(
        "Nested(id UInt32, name String)",
        rows,
        "[(1,'one'),(2,'two')]",
        "[(1,'one'),(2,'two')]",
    );
}

#[test]
fn test_geo() {
    let point = Value::Tuple(vec![Value::Float64(1.5), Value::Float64(-2.0)]);
    check("Point", point.clone(), "(1.5,-2)", "(1.5,-2)");
    let ring = Value::Array(vec![point.clone(), point]);
    check("Ring", ring, "[(1.5,-2),(1.5,-2)]", "[(1.5,-2),(1.5,-2)]");
}

// ============================================================================
// Variant, Dynamic and JSON
// ============================================================================

#[test]
fn test_variant_picks_matching_member() {
    let ty = "Variant(String, UInt64)";
    check(ty, Value::UInt64(5), "5", "5");
    check(ty, Value::from("five"), "'five'", "five");
    check(ty, Value::Null, "null", "\\N");
}

#[test]
fn test_dynamic_uses_value_type() {
    check("Dynamic", Value::Int32(7), "7", "7");
    check("Dynamic", Value::from("s"), "'s'", "s");
    check(
        "Dynamic",
        Value::Array(vec![Value::Int64(1), Value::Int64(2)]),
        "[1,2]",
        "[1,2]",
    );
}

#[test]
fn test_json_text() {
    let value = Value::Json(json!({"a": 1, "b": {"c": "x"}}));
    check("JSON", value, r#"'{"a":1,"b":{"c":"x"}}'"#, r#"{"a":1,"b":{"c":"x"}}"#);

    let ty = Type::parse("JSON").unwrap();
    assert!(matches!(
        ty.format(&Value::Json(json!([1, 2])), FormatMode::SqlLiteral),
        Err(Error::UnsupportedConversion(_))
    ));
}

// ============================================================================
// Parameter Helpers
// ============================================================================

#[test]
fn test_query_parameter_names() {
    let ty = Type::parse("Array(String)").unwrap();
    let value = Value::Array(vec![Value::from("a"), Value::from("b")]);
    let (key, text) = query_parameter("_tags2", &ty, &value).unwrap();
    assert_eq!(key, "param__tags2");
    assert_eq!(text, "['a','b']");

    for bad in ["", "2x", "a-b", "é"] {
        assert!(
            matches!(query_parameter(bad, &ty, &value), Err(Error::InvalidArgument(_))),
            "{:?} should be rejected",
            bad
        );
    }
}

#[test]
fn test_encode_query_parameter() {
    let ty = Type::parse("Nullable(String)").unwrap();
    assert_eq!(encode_query_parameter("n", &ty, &Value::Null).unwrap(), "param_n=%5CN");

    let ty = Type::parse("Map(String, UInt8)").unwrap();
    let map = Value::Map(vec![(Value::from("k"), Value::UInt8(1))]);
    assert_eq!(
        encode_query_parameter("m", &ty, &map).unwrap(),
        "param_m=%7B%27k%27%3A1%7D"
    );
}

#[test]
fn test_non_utf8_bytes() {
    let ty = Type::string();
    let value = Value::Bytes(vec![0xC3, 0x28]);
    assert_eq!(ty.format(&value, FormatMode::SqlLiteral).unwrap(), "unhex('C328')");
    assert!(matches!(
        ty.format(&value, FormatMode::QueryParameter),
        Err(Error::UnsupportedConversion(_))
    ));
}
