//! # Parameter Formatting
//!
//! Renders a [`Value`] as text for a declared [`Type`], in one of two
//! flavors:
//!
//! - [`FormatMode::SqlLiteral`]: a fragment that can be inlined into a query
//!   (`toDate('2024-01-31')`, `toDecimal64('1.50', 2)`, `['a','b']`)
//! - [`FormatMode::QueryParameter`]: the value of an HTTP `param_<name>`
//!   field sent next to a `{name:Type}` placeholder (`2024-01-31`, `1.50`)
//!
//! Both flavors are parsed back by the server into the declared type, so
//! `SELECT {p:T}` returns the value that was sent.

mod query_parameter;
mod sql_literal;

pub use query_parameter::{
    encode_query_parameter,
    query_parameter,
};

use crate::{
    codec::decimal::decimal_mantissa,
    numeric::ClickHouseDecimal,
    types::Type,
    Result,
    Value,
};

/// Text flavor produced by [`Type::format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatMode {
    /// Inline SQL literal; NULL is `null`.
    SqlLiteral,
    /// HTTP query parameter; a top-level NULL is `\N`.
    QueryParameter,
}

/// NULL in query parameter mode when not nested in a container.
pub const NULL_PARAMETER: &str = "\\N";

impl Type {
    /// Render `value` as text in the given mode.
    ///
    /// # Example
    ///
    /// ```
    /// use clickhouse_type_codec::{FormatMode, Type, Value};
    ///
    /// let ty = Type::parse("Array(String)").unwrap();
    /// let value = Value::Array(vec![Value::from("it's")]);
    /// assert_eq!(ty.format(&value, FormatMode::SqlLiteral).unwrap(), r"['it\'s']");
    /// assert_eq!(ty.format(&value, FormatMode::QueryParameter).unwrap(), r"['it\'s']");
    /// ```
    pub fn format(&self, value: &Value, mode: FormatMode) -> Result<String> {
        match mode {
            FormatMode::SqlLiteral => sql_literal::format_literal(self, value),
            FormatMode::QueryParameter => {
                query_parameter::format_parameter(self, value, false)
            }
        }
    }
}

/// Escape a string for a single-quoted ClickHouse literal.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            '\u{8}' => out.push_str("\\b"),
            c => out.push(c),
        }
    }
    out
}

/// Escape and wrap in single quotes.
pub fn quote_string(s: &str) -> String {
    format!("'{}'", escape_string(s))
}

pub(crate) fn format_float(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        value.to_string()
    }
}

pub(crate) fn format_float32(value: f32) -> String {
    if value.is_finite() {
        value.to_string()
    } else {
        format_float(value as f64)
    }
}

/// Decimal text at exactly `scale` fraction digits.
pub(crate) fn decimal_text(precision: u32, scale: u32, value: &Value) -> Result<String> {
    let mantissa = decimal_mantissa(precision, scale, value)?;
    Ok(ClickHouseDecimal::new(mantissa, scale).to_string())
}

fn join<I: IntoIterator<Item = Result<String>>>(parts: I) -> Result<String> {
    Ok(parts.into_iter().collect::<Result<Vec<_>>>()?.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string("a'b\\c"), "a\\'b\\\\c");
        assert_eq!(escape_string("line\nnext\ttab\r\0\u{8}"), "line\\nnext\\ttab\\r\\0\\b");
        assert_eq!(quote_string("x"), "'x'");
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(f64::NAN), "nan");
        assert_eq!(format_float(f64::NEG_INFINITY), "-inf");
        assert_eq!(format_float(1.5), "1.5");
        assert_eq!(format_float32(0.1), "0.1");
    }

    #[test]
    fn test_decimal_text_pads_scale() {
        let value = Value::Decimal("1.5".parse().unwrap());
        assert_eq!(decimal_text(10, 3, &value).unwrap(), "1.500");
        assert_eq!(decimal_text(10, 0, &Value::Int32(-7)).unwrap(), "-7");
    }
}
