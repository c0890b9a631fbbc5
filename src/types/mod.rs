//! # ClickHouse Type System
//!
//! Textual type descriptors such as `Array(Nullable(Decimal(18, 5)))` are
//! parsed by [`parser`] into a [`TypeAst`], resolved by the
//! [`TypeRegistry`] into a [`Type`], and the resulting tree drives the
//! RowBinary codecs (`Type::decode`, `Type::encode`) and the parameter
//! formatters (`Type::format`).
//!
//! ## ClickHouse Documentation References
//!
//! ### Numeric Types
//! - [Integer Types](https://clickhouse.com/docs/en/sql-reference/data-types/int-uint)
//!   - Int8/16/32/64/128/256, UInt8/16/32/64/128/256
//! - [Floating-Point Types](https://clickhouse.com/docs/en/sql-reference/data-types/float)
//! - [Decimal Types](https://clickhouse.com/docs/en/sql-reference/data-types/decimal)
//!   - Decimal(P, S), Decimal32/64/128/256(S)
//! - [Boolean](https://clickhouse.com/docs/en/sql-reference/data-types/boolean)
//!
//! ### Strings, Dates, Identifiers
//! - [String](https://clickhouse.com/docs/en/sql-reference/data-types/string),
//!   [FixedString](https://clickhouse.com/docs/en/sql-reference/data-types/fixedstring)
//! - [Date](https://clickhouse.com/docs/en/sql-reference/data-types/date),
//!   [Date32](https://clickhouse.com/docs/en/sql-reference/data-types/date32),
//!   [DateTime](https://clickhouse.com/docs/en/sql-reference/data-types/datetime),
//!   [DateTime64](https://clickhouse.com/docs/en/sql-reference/data-types/datetime64)
//! - [UUID](https://clickhouse.com/docs/en/sql-reference/data-types/uuid),
//!   [IPv4/IPv6](https://clickhouse.com/docs/en/sql-reference/data-types/ipv4)
//!
//! ### Compound and Special Types
//! - Array, Tuple, Nested, Map, Nullable, LowCardinality, Enum8/16
//! - [Variant](https://clickhouse.com/docs/en/sql-reference/data-types/variant),
//!   [Dynamic](https://clickhouse.com/docs/en/sql-reference/data-types/dynamic),
//!   [JSON](https://clickhouse.com/docs/en/sql-reference/data-types/newjson)
//! - SimpleAggregateFunction(f, T) is stored exactly like `T`
//! - Geo: Point = Tuple(Float64, Float64), Ring = Array(Point),
//!   Polygon = Array(Ring), MultiPolygon = Array(Polygon)

pub mod binary;
pub mod parser;
pub mod registry;

pub use parser::{
    parse_type_ast,
    AstKind,
    TypeAst,
};
pub use registry::{
    TypeCache,
    TypeRegistry,
};

use crate::{
    Error,
    Result,
    TypeSettings,
};
use chrono_tz::Tz;
use std::{
    collections::HashMap,
    fmt,
    sync::Arc,
};

/// Type code enumeration matching ClickHouse type families
///
/// Parametric families (Array, Decimal, ...) carry their parameters in the
/// corresponding [`Type`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    /// Type of a NULL literal; has no values of its own.
    Nothing = 0,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Int128,
    Int256,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    UInt128,
    UInt256,
    Float32,
    Float64,
    String,
    FixedString,
    Date,
    Date32,
    DateTime,
    DateTime64,
    Decimal,
    UUID,
    IPv4,
    IPv6,
    Enum8,
    Enum16,
    Array,
    Nullable,
    Tuple,
    Nested,
    LowCardinality,
    Map,
    Variant,
    SimpleAggregateFunction,
    Dynamic,
    /// The `JSON` type.
    Json,
    /// The legacy `Object('json')` spelling of JSON.
    Object,
    Point,
    Ring,
    Polygon,
    MultiPolygon,
}

impl TypeCode {
    /// Returns the ClickHouse type name string for this type code.
    pub fn name(&self) -> &'static str {
        match self {
            TypeCode::Nothing => "Nothing",
            TypeCode::Bool => "Bool",
            TypeCode::Int8 => "Int8",
            TypeCode::Int16 => "Int16",
            TypeCode::Int32 => "Int32",
            TypeCode::Int64 => "Int64",
            TypeCode::Int128 => "Int128",
            TypeCode::Int256 => "Int256",
            TypeCode::UInt8 => "UInt8",
            TypeCode::UInt16 => "UInt16",
            TypeCode::UInt32 => "UInt32",
            TypeCode::UInt64 => "UInt64",
            TypeCode::UInt128 => "UInt128",
            TypeCode::UInt256 => "UInt256",
            TypeCode::Float32 => "Float32",
            TypeCode::Float64 => "Float64",
            TypeCode::String => "String",
            TypeCode::FixedString => "FixedString",
            TypeCode::Date => "Date",
            TypeCode::Date32 => "Date32",
            TypeCode::DateTime => "DateTime",
            TypeCode::DateTime64 => "DateTime64",
            TypeCode::Decimal => "Decimal",
            TypeCode::UUID => "UUID",
            TypeCode::IPv4 => "IPv4",
            TypeCode::IPv6 => "IPv6",
            TypeCode::Enum8 => "Enum8",
            TypeCode::Enum16 => "Enum16",
            TypeCode::Array => "Array",
            TypeCode::Nullable => "Nullable",
            TypeCode::Tuple => "Tuple",
            TypeCode::Nested => "Nested",
            TypeCode::LowCardinality => "LowCardinality",
            TypeCode::Map => "Map",
            TypeCode::Variant => "Variant",
            TypeCode::SimpleAggregateFunction => "SimpleAggregateFunction",
            TypeCode::Dynamic => "Dynamic",
            TypeCode::Json => "JSON",
            TypeCode::Object => "Object",
            TypeCode::Point => "Point",
            TypeCode::Ring => "Ring",
            TypeCode::Polygon => "Polygon",
            TypeCode::MultiPolygon => "MultiPolygon",
        }
    }

    /// True for the fixed-width integer families.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
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
                | TypeCode::UInt256
        )
    }
}

/// Enum item for Enum8/Enum16 types, mapping a name to its integer value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumItem {
    pub name: String,
    pub value: i16,
}

/// Bidirectional symbol/code table of an enum type, built once at parse
/// time.
#[derive(Debug, Clone)]
pub struct EnumItems {
    items: Vec<EnumItem>,
    by_value: HashMap<i16, usize>,
    by_name: HashMap<String, usize>,
}

impl EnumItems {
    /// Fails on duplicate names or codes.
    pub fn new(items: Vec<EnumItem>) -> Result<Self> {
        let mut by_value = HashMap::with_capacity(items.len());
        let mut by_name = HashMap::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            if by_value.insert(item.value, index).is_some() {
                return Err(Error::grammar(
                    "Duplicate enum value",
                    item.value.to_string(),
                ));
            }
            if by_name.insert(item.name.clone(), index).is_some() {
                return Err(Error::grammar("Duplicate enum name", item.name.clone()));
            }
        }
        Ok(Self { items, by_value, by_name })
    }

    pub fn items(&self) -> &[EnumItem] {
        &self.items
    }

    pub fn name_of(&self, value: i16) -> Option<&str> {
        self.by_value.get(&value).map(|&i| self.items[i].name.as_str())
    }

    pub fn value_of(&self, name: &str) -> Option<i16> {
        self.by_name.get(name).map(|&i| self.items[i].value)
    }

    pub fn contains_value(&self, value: i16) -> bool {
        self.by_value.contains_key(&value)
    }
}

impl PartialEq for EnumItems {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl Eq for EnumItems {}

/// Timezone of a DateTime/DateTime64 column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeZone {
    /// Named in the type descriptor, e.g. `DateTime('Asia/Tokyo')`.
    Explicit(Tz),
    /// Taken from [`TypeSettings::timezone`].
    Default(Tz),
}

impl TimeZone {
    pub fn tz(&self) -> Tz {
        match self {
            TimeZone::Explicit(tz) | TimeZone::Default(tz) => *tz,
        }
    }

    pub fn explicit(&self) -> Option<Tz> {
        match self {
            TimeZone::Explicit(tz) => Some(*tz),
            TimeZone::Default(_) => None,
        }
    }
}

/// Highest sub-second precision of DateTime64.
pub const MAX_DATETIME64_PRECISION: u32 = 9;

/// Highest precision of Decimal256.
pub const MAX_DECIMAL_PRECISION: u32 = 76;

/// ClickHouse type definition, representing both simple and parametric types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// A non-parametric type identified by its [`TypeCode`].
    Simple(TypeCode),
    FixedString {
        size: usize,
    },
    DateTime {
        timezone: TimeZone,
    },
    DateTime64 {
        /// Sub-second digits, 0 to 9.
        precision: u32,
        timezone: TimeZone,
    },
    /// Decimal(P, S); Decimal32/64/128/256(S) resolve to P = 9/18/38/76.
    Decimal {
        precision: u32,
        scale: u32,
        /// Decode into `ClickHouseDecimal` rather than `rust_decimal`.
        use_big_decimal: bool,
    },
    Enum8 {
        items: EnumItems,
    },
    Enum16 {
        items: EnumItems,
    },
    Array {
        item_type: Box<Type>,
    },
    Nullable {
        nested_type: Box<Type>,
    },
    Tuple {
        item_types: Vec<Type>,
        /// Element names of a named tuple such as `Tuple(a Int32, b String)`.
        item_names: Option<Vec<String>>,
    },
    /// `Nested(a T1, b T2)`, stored as `Array(Tuple(T1, T2))`.
    Nested {
        fields: Vec<(String, Type)>,
    },
    LowCardinality {
        nested_type: Box<Type>,
    },
    Map {
        key_type: Box<Type>,
        value_type: Box<Type>,
    },
    Variant {
        variants: Vec<Type>,
    },
    SimpleAggregateFunction {
        function: String,
        nested_type: Box<Type>,
    },
}

impl Type {
    /// Parse a descriptor with default [`TypeSettings`].
    pub fn parse(type_str: &str) -> Result<Self> {
        Self::parse_with_settings(type_str, &TypeSettings::default())
    }

    pub fn parse_with_settings(type_str: &str, settings: &TypeSettings) -> Result<Self> {
        TypeRegistry::global().parse(type_str, settings)
    }

    /// Returns the [`TypeCode`] for this type.
    pub fn code(&self) -> TypeCode {
        match self {
            Type::Simple(code) => *code,
            Type::FixedString { .. } => TypeCode::FixedString,
            Type::DateTime { .. } => TypeCode::DateTime,
            Type::DateTime64 { .. } => TypeCode::DateTime64,
            Type::Decimal { .. } => TypeCode::Decimal,
            Type::Enum8 { .. } => TypeCode::Enum8,
            Type::Enum16 { .. } => TypeCode::Enum16,
            Type::Array { .. } => TypeCode::Array,
            Type::Nullable { .. } => TypeCode::Nullable,
            Type::Tuple { .. } => TypeCode::Tuple,
            Type::Nested { .. } => TypeCode::Nested,
            Type::LowCardinality { .. } => TypeCode::LowCardinality,
            Type::Map { .. } => TypeCode::Map,
            Type::Variant { .. } => TypeCode::Variant,
            Type::SimpleAggregateFunction { .. } => {
                TypeCode::SimpleAggregateFunction
            }
        }
    }

    /// Returns the normalized ClickHouse type name, including parameters.
    pub fn name(&self) -> String {
        match self {
            Type::Simple(TypeCode::Object) => "Object('json')".to_string(),
            Type::Simple(code) => code.name().to_string(),
            Type::FixedString { size } => format!("FixedString({})", size),
            Type::DateTime { timezone } => match timezone.explicit() {
                Some(tz) => format!("DateTime('{}')", tz.name()),
                None => "DateTime".to_string(),
            },
            Type::DateTime64 { precision, timezone } => {
                match timezone.explicit() {
                    Some(tz) => {
                        format!("DateTime64({}, '{}')", precision, tz.name())
                    }
                    None => format!("DateTime64({})", precision),
                }
            }
            Type::Decimal { precision, scale, .. } => {
                format!("Decimal({}, {})", precision, scale)
            }
            Type::Enum8 { items } => {
                format!("Enum8({})", format_enum_items(items.items()))
            }
            Type::Enum16 { items } => {
                format!("Enum16({})", format_enum_items(items.items()))
            }
            Type::Array { item_type } => {
                format!("Array({})", item_type.name())
            }
            Type::Nullable { nested_type } => {
                format!("Nullable({})", nested_type.name())
            }
            Type::Tuple { item_types, item_names } => {
                let types: Vec<String> = match item_names {
                    Some(names) => names
                        .iter()
                        .zip(item_types)
                        .map(|(n, t)| format!("{} {}", quote_identifier(n), t.name()))
                        .collect(),
                    None => item_types.iter().map(|t| t.name()).collect(),
                };
                format!("Tuple({})", types.join(", "))
            }
            Type::Nested { fields } => {
                let fields: Vec<String> = fields
                    .iter()
                    .map(|(n, t)| format!("{} {}", quote_identifier(n), t.name()))
                    .collect();
                format!("Nested({})", fields.join(", "))
            }
            Type::LowCardinality { nested_type } => {
                format!("LowCardinality({})", nested_type.name())
            }
            Type::Map { key_type, value_type } => {
                format!("Map({}, {})", key_type.name(), value_type.name())
            }
            Type::Variant { variants } => {
                let types: Vec<String> = variants.iter().map(|t| t.name()).collect();
                format!("Variant({})", types.join(", "))
            }
            Type::SimpleAggregateFunction { function, nested_type } => {
                format!(
                    "SimpleAggregateFunction({}, {})",
                    function,
                    nested_type.name()
                )
            }
        }
    }

    /// Wire width of a decimal with the given precision.
    pub fn decimal_width(precision: u32) -> usize {
        match precision {
            0..=9 => 4,
            10..=18 => 8,
            19..=38 => 16,
            _ => 32,
        }
    }

    /// Equivalent composite layout of a geo type.
    pub fn geo_layout(code: TypeCode) -> Option<Type> {
        match code {
            TypeCode::Point => {
                Some(Type::tuple(vec![Type::float64(), Type::float64()]))
            }
            TypeCode::Ring => Some(Type::array(Type::point())),
            TypeCode::Polygon => Some(Type::array(Type::ring())),
            TypeCode::MultiPolygon => Some(Type::array(Type::polygon())),
            _ => None,
        }
    }

    /// True if NULL is a valid value of this type.
    pub fn is_nullable(&self) -> bool {
        match self {
            Type::Nullable { .. } => true,
            Type::Simple(TypeCode::Nothing)
            | Type::Simple(TypeCode::Dynamic)
            | Type::Variant { .. } => true,
            Type::LowCardinality { nested_type }
            | Type::SimpleAggregateFunction { nested_type, .. } => {
                nested_type.is_nullable()
            }
            _ => false,
        }
    }

    pub fn nothing() -> Self {
        Type::Simple(TypeCode::Nothing)
    }

    pub fn bool() -> Self {
        Type::Simple(TypeCode::Bool)
    }

    pub fn int8() -> Self {
        Type::Simple(TypeCode::Int8)
    }

    pub fn int16() -> Self {
        Type::Simple(TypeCode::Int16)
    }

    pub fn int32() -> Self {
        Type::Simple(TypeCode::Int32)
    }

    pub fn int64() -> Self {
        Type::Simple(TypeCode::Int64)
    }

    pub fn int128() -> Self {
        Type::Simple(TypeCode::Int128)
    }

    pub fn int256() -> Self {
        Type::Simple(TypeCode::Int256)
    }

    pub fn uint8() -> Self {
        Type::Simple(TypeCode::UInt8)
    }

    pub fn uint16() -> Self {
        Type::Simple(TypeCode::UInt16)
    }

    pub fn uint32() -> Self {
        Type::Simple(TypeCode::UInt32)
    }

    pub fn uint64() -> Self {
        Type::Simple(TypeCode::UInt64)
    }

    pub fn uint128() -> Self {
        Type::Simple(TypeCode::UInt128)
    }

    pub fn uint256() -> Self {
        Type::Simple(TypeCode::UInt256)
    }

    pub fn float32() -> Self {
        Type::Simple(TypeCode::Float32)
    }

    pub fn float64() -> Self {
        Type::Simple(TypeCode::Float64)
    }

    pub fn string() -> Self {
        Type::Simple(TypeCode::String)
    }

    pub fn fixed_string(size: usize) -> Self {
        Type::FixedString { size }
    }

    pub fn date() -> Self {
        Type::Simple(TypeCode::Date)
    }

    pub fn date32() -> Self {
        Type::Simple(TypeCode::Date32)
    }

    /// DateTime in the given zone, or UTC as the unnamed default.
    pub fn datetime(timezone: Option<Tz>) -> Self {
        Type::DateTime { timezone: explicit_or_utc(timezone) }
    }

    /// Fails with [`Error::InvalidArgument`] above
    /// [`MAX_DATETIME64_PRECISION`].
    pub fn datetime64(precision: u32, timezone: Option<Tz>) -> Result<Self> {
        if precision > MAX_DATETIME64_PRECISION {
            return Err(Error::InvalidArgument(format!(
                "DateTime64 precision must be at most {}, got {}",
                MAX_DATETIME64_PRECISION, precision
            )));
        }
        Ok(Type::DateTime64 { precision, timezone: explicit_or_utc(timezone) })
    }

    pub fn decimal(precision: u32, scale: u32) -> Self {
        Type::Decimal { precision, scale, use_big_decimal: true }
    }

    pub fn uuid() -> Self {
        Type::Simple(TypeCode::UUID)
    }

    pub fn ipv4() -> Self {
        Type::Simple(TypeCode::IPv4)
    }

    pub fn ipv6() -> Self {
        Type::Simple(TypeCode::IPv6)
    }

    pub fn enum8(items: Vec<EnumItem>) -> Result<Self> {
        Ok(Type::Enum8 { items: EnumItems::new(items)? })
    }

    pub fn enum16(items: Vec<EnumItem>) -> Result<Self> {
        Ok(Type::Enum16 { items: EnumItems::new(items)? })
    }

    pub fn array(item_type: Type) -> Self {
        Type::Array { item_type: Box::new(item_type) }
    }

    pub fn nullable(nested_type: Type) -> Self {
        Type::Nullable { nested_type: Box::new(nested_type) }
    }

    pub fn tuple(item_types: Vec<Type>) -> Self {
        Type::Tuple { item_types, item_names: None }
    }

    pub fn low_cardinality(nested_type: Type) -> Self {
        Type::LowCardinality { nested_type: Box::new(nested_type) }
    }

    pub fn map(key_type: Type, value_type: Type) -> Self {
        Type::Map {
            key_type: Box::new(key_type),
            value_type: Box::new(value_type),
        }
    }

    pub fn variant(variants: Vec<Type>) -> Self {
        Type::Variant { variants }
    }

    pub fn point() -> Self {
        Type::Simple(TypeCode::Point)
    }

    pub fn ring() -> Self {
        Type::Simple(TypeCode::Ring)
    }

    pub fn polygon() -> Self {
        Type::Simple(TypeCode::Polygon)
    }

    pub fn multi_polygon() -> Self {
        Type::Simple(TypeCode::MultiPolygon)
    }

    pub fn dynamic() -> Self {
        Type::Simple(TypeCode::Dynamic)
    }

    pub fn json() -> Self {
        Type::Simple(TypeCode::Json)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Reference-counted shared pointer to a [`Type`].
pub type TypeRef = Arc<Type>;

fn explicit_or_utc(timezone: Option<Tz>) -> TimeZone {
    match timezone {
        Some(tz) => TimeZone::Explicit(tz),
        None => TimeZone::Default(Tz::UTC),
    }
}

/// Escape a string for use inside single quotes in a type descriptor.
pub(crate) fn escape_quoted(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

fn quote_identifier(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if plain {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

fn format_enum_items(items: &[EnumItem]) -> String {
    let formatted: Vec<String> = items
        .iter()
        .map(|item| format!("'{}' = {}", escape_quoted(&item.name), item.value))
        .collect();
    formatted.join(", ")
}
