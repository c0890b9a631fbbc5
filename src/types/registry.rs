//! Name to constructor table and the type cache.
//!
//! The registry is built once on first use and is read-only afterwards.
//! Each constructor validates the arguments of its family and recurses back
//! into the registry for nested types.

use super::{
    parser::{
        parse_type_ast,
        AstKind,
        TypeAst,
    },
    EnumItem,
    EnumItems,
    TimeZone,
    Type,
    TypeCode,
    TypeRef,
    MAX_DATETIME64_PRECISION,
    MAX_DECIMAL_PRECISION,
};
use crate::{
    Error,
    Result,
    TypeSettings,
};
use chrono_tz::Tz;
use parking_lot::RwLock;
use std::{
    collections::HashMap,
    sync::{
        Arc,
        OnceLock,
    },
};
use tracing::{
    debug,
    trace,
    warn,
};

type Constructor =
    Box<dyn Fn(&TypeAst, &TypeRegistry, &TypeSettings) -> Result<Type> + Send + Sync>;

/// Maps type family names to their constructors.
pub struct TypeRegistry {
    constructors: HashMap<&'static str, Constructor>,
}

static GLOBAL_REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();

const SIMPLE_TYPES: &[(&str, TypeCode)] = &[
    ("Nothing", TypeCode::Nothing),
    ("Bool", TypeCode::Bool),
    ("Boolean", TypeCode::Bool),
    ("Int8", TypeCode::Int8),
    ("Int16", TypeCode::Int16),
    ("Int32", TypeCode::Int32),
    ("Int64", TypeCode::Int64),
    ("Int128", TypeCode::Int128),
    ("Int256", TypeCode::Int256),
    ("UInt8", TypeCode::UInt8),
    ("UInt16", TypeCode::UInt16),
    ("UInt32", TypeCode::UInt32),
    ("UInt64", TypeCode::UInt64),
    ("UInt128", TypeCode::UInt128),
    ("UInt256", TypeCode::UInt256),
    ("Float32", TypeCode::Float32),
    ("Float64", TypeCode::Float64),
    ("String", TypeCode::String),
    ("Date", TypeCode::Date),
    ("Date32", TypeCode::Date32),
    ("UUID", TypeCode::UUID),
    ("IPv4", TypeCode::IPv4),
    ("IPv6", TypeCode::IPv6),
    ("Point", TypeCode::Point),
    ("Ring", TypeCode::Ring),
    ("Polygon", TypeCode::Polygon),
    ("MultiPolygon", TypeCode::MultiPolygon),
];

fn constructor<F>(f: F) -> Constructor
where
    F: Fn(&TypeAst, &TypeRegistry, &TypeSettings) -> Result<Type> + Send + Sync + 'static,
{
    Box::new(f)
}

impl TypeRegistry {
    /// The process-wide registry.
    pub fn global() -> &'static TypeRegistry {
        GLOBAL_REGISTRY.get_or_init(TypeRegistry::new)
    }

    fn new() -> Self {
        let mut constructors: HashMap<&'static str, Constructor> = HashMap::new();

        for &(name, code) in SIMPLE_TYPES {
            constructors.insert(
                name,
                constructor(move |ast, _, _| {
                    expect_no_args(ast)?;
                    Ok(Type::Simple(code))
                }),
            );
        }

        constructors.insert("FixedString", constructor(fixed_string));
        constructors.insert("DateTime", constructor(datetime));
        constructors.insert("DateTime64", constructor(datetime64));
        constructors.insert("Decimal", constructor(decimal));
        for (name, precision) in [
            ("Decimal32", 9),
            ("Decimal64", 18),
            ("Decimal128", 38),
            ("Decimal256", 76),
        ] {
            constructors.insert(
                name,
                constructor(move |ast, _, settings| sized_decimal(ast, precision, settings)),
            );
        }
        constructors.insert("Enum8", constructor(enum8));
        constructors.insert("Enum", constructor(enum8));
        constructors.insert("Enum16", constructor(enum16));
        constructors.insert(
            "Array",
            constructor(|ast, registry, settings| {
                Ok(Type::array(single_type_arg(ast, registry, settings)?))
            }),
        );
        constructors.insert(
            "Nullable",
            constructor(|ast, registry, settings| {
                Ok(Type::nullable(single_type_arg(ast, registry, settings)?))
            }),
        );
        constructors.insert(
            "LowCardinality",
            constructor(|ast, registry, settings| {
                Ok(Type::low_cardinality(single_type_arg(ast, registry, settings)?))
            }),
        );
        constructors.insert("Tuple", constructor(tuple));
        constructors.insert("Nested", constructor(nested));
        constructors.insert("Map", constructor(map));
        constructors.insert("Variant", constructor(variant));
        constructors.insert("SimpleAggregateFunction", constructor(simple_aggregate_function));
        constructors.insert("Object", constructor(object));
        constructors.insert("JSON", constructor(|_, _, _| Ok(Type::json())));
        constructors.insert("Dynamic", constructor(dynamic));

        Self { constructors }
    }

    /// True if `name` is a known type family.
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Resolve a syntax tree into a type.
    pub fn resolve(&self, ast: &TypeAst, settings: &TypeSettings) -> Result<Type> {
        if ast.kind != AstKind::Type {
            return Err(Error::grammar("Expected a type", ast.raw_value.clone()));
        }
        trace!(type_name = %ast.raw_value, "resolving type");
        let build = self
            .constructors
            .get(ast.name.as_str())
            .ok_or_else(|| Error::UnknownType(ast.name.clone()))?;
        build(ast, self, settings)
    }

    /// Parse a descriptor and resolve it.
    pub fn parse(&self, type_str: &str, settings: &TypeSettings) -> Result<Type> {
        let ast = parse_type_ast(type_str)?;
        self.resolve(&ast, settings)
    }
}

fn expect_no_args(ast: &TypeAst) -> Result<()> {
    if ast.children.is_empty() {
        Ok(())
    } else {
        Err(Error::grammar(
            format!("{} takes no parameters", ast.name),
            ast.raw_value.clone(),
        ))
    }
}

fn expect_arg_count(ast: &TypeAst, min: usize, max: usize) -> Result<()> {
    let count = ast.children.len();
    if (min..=max).contains(&count) {
        return Ok(());
    }
    let expected = if min == max {
        min.to_string()
    } else {
        format!("{} to {}", min, max)
    };
    Err(Error::grammar(
        format!("{} expects {} parameters, got {}", ast.name, expected, count),
        ast.raw_value.clone(),
    ))
}

fn number_arg<T: std::str::FromStr>(ast: &TypeAst, index: usize) -> Result<T> {
    let child = &ast.children[index];
    if child.kind != AstKind::Number {
        return Err(Error::grammar(
            format!("{} expects a number", ast.name),
            child.raw_value.clone(),
        ));
    }
    child
        .name
        .parse::<T>()
        .map_err(|_| Error::grammar("Number out of range", child.raw_value.clone()))
}

fn string_arg<'a>(ast: &'a TypeAst, index: usize) -> Result<&'a str> {
    let child = &ast.children[index];
    if child.kind != AstKind::String {
        return Err(Error::grammar(
            format!("{} expects a quoted string", ast.name),
            child.raw_value.clone(),
        ));
    }
    Ok(&child.name)
}

fn single_type_arg(
    ast: &TypeAst,
    registry: &TypeRegistry,
    settings: &TypeSettings,
) -> Result<Type> {
    expect_arg_count(ast, 1, 1)?;
    registry.resolve(&ast.children[0], settings)
}

fn fixed_string(ast: &TypeAst, _: &TypeRegistry, _: &TypeSettings) -> Result<Type> {
    expect_arg_count(ast, 1, 1)?;
    let size: usize = number_arg(ast, 0)?;
    if size == 0 {
        return Err(Error::grammar("FixedString size must be positive", ast.raw_value.clone()));
    }
    Ok(Type::FixedString { size })
}

fn timezone_arg(ast: &TypeAst, index: usize, settings: &TypeSettings) -> Result<TimeZone> {
    if ast.children.len() <= index {
        return Ok(TimeZone::Default(settings.timezone));
    }
    let name = string_arg(ast, index)?;
    match name.parse::<Tz>() {
        Ok(tz) => Ok(TimeZone::Explicit(tz)),
        Err(_) => {
            warn!(
                timezone = name,
                fallback = settings.timezone.name(),
                "unknown timezone, using default"
            );
            Ok(TimeZone::Default(settings.timezone))
        }
    }
}

fn datetime(ast: &TypeAst, _: &TypeRegistry, settings: &TypeSettings) -> Result<Type> {
    expect_arg_count(ast, 0, 1)?;
    Ok(Type::DateTime { timezone: timezone_arg(ast, 0, settings)? })
}

fn datetime64(ast: &TypeAst, _: &TypeRegistry, settings: &TypeSettings) -> Result<Type> {
    expect_arg_count(ast, 1, 2)?;
    let precision: u32 = number_arg(ast, 0)?;
    if precision > MAX_DATETIME64_PRECISION {
        return Err(Error::grammar(
            format!("DateTime64 precision must be at most {}", MAX_DATETIME64_PRECISION),
            ast.raw_value.clone(),
        ));
    }
    Ok(Type::DateTime64 { precision, timezone: timezone_arg(ast, 1, settings)? })
}

fn make_decimal(
    ast: &TypeAst,
    precision: u32,
    scale: u32,
    settings: &TypeSettings,
) -> Result<Type> {
    if precision == 0 || precision > MAX_DECIMAL_PRECISION {
        return Err(Error::grammar(
            format!("Decimal precision must be in 1..={}", MAX_DECIMAL_PRECISION),
            ast.raw_value.clone(),
        ));
    }
    if scale > precision {
        return Err(Error::grammar(
            "Decimal scale must not exceed precision",
            ast.raw_value.clone(),
        ));
    }
    Ok(Type::Decimal { precision, scale, use_big_decimal: settings.use_big_decimal })
}

fn decimal(ast: &TypeAst, _: &TypeRegistry, settings: &TypeSettings) -> Result<Type> {
    expect_arg_count(ast, 1, 2)?;
    let precision: u32 = number_arg(ast, 0)?;
    let scale: u32 = if ast.children.len() > 1 { number_arg(ast, 1)? } else { 0 };
    make_decimal(ast, precision, scale, settings)
}

fn sized_decimal(ast: &TypeAst, precision: u32, settings: &TypeSettings) -> Result<Type> {
    expect_arg_count(ast, 1, 1)?;
    let scale: u32 = number_arg(ast, 0)?;
    make_decimal(ast, precision, scale, settings)
}

fn enum_items(ast: &TypeAst, min: i16, max: i16) -> Result<EnumItems> {
    if ast.children.is_empty() {
        return Err(Error::grammar(
            format!("{} needs at least one value", ast.name),
            ast.raw_value.clone(),
        ));
    }

    let mut items = Vec::with_capacity(ast.children.len());
    for child in &ast.children {
        let (key, code) = match (child.kind, child.children.as_slice()) {
            (AstKind::Assign, [key, code])
                if key.kind == AstKind::String && code.kind == AstKind::Number =>
            {
                (key, code)
            }
            _ => {
                return Err(Error::grammar(
                    "Expected 'name' = value",
                    child.raw_value.clone(),
                ))
            }
        };
        let value: i16 = code
            .name
            .parse()
            .map_err(|_| Error::grammar("Enum value out of range", child.raw_value.clone()))?;
        if value < min || value > max {
            return Err(Error::grammar("Enum value out of range", child.raw_value.clone()));
        }
        items.push(EnumItem { name: key.name.clone(), value });
    }
    EnumItems::new(items)
}

fn enum8(ast: &TypeAst, _: &TypeRegistry, _: &TypeSettings) -> Result<Type> {
    Ok(Type::Enum8 { items: enum_items(ast, i8::MIN as i16, i8::MAX as i16)? })
}

fn enum16(ast: &TypeAst, _: &TypeRegistry, _: &TypeSettings) -> Result<Type> {
    Ok(Type::Enum16 { items: enum_items(ast, i16::MIN, i16::MAX)? })
}

fn tuple(ast: &TypeAst, registry: &TypeRegistry, settings: &TypeSettings) -> Result<Type> {
    let item_types = ast
        .children
        .iter()
        .map(|child| registry.resolve(child, settings))
        .collect::<Result<Vec<_>>>()?;

    let named = ast.children.iter().filter(|c| c.field.is_some()).count();
    let item_names = if named == 0 {
        None
    } else if named == ast.children.len() {
        Some(ast.children.iter().filter_map(|c| c.field.clone()).collect())
    } else {
        return Err(Error::grammar(
            "Tuple elements must be all named or all unnamed",
            ast.raw_value.clone(),
        ));
    };

    Ok(Type::Tuple { item_types, item_names })
}

fn nested(ast: &TypeAst, registry: &TypeRegistry, settings: &TypeSettings) -> Result<Type> {
    if ast.children.is_empty() {
        return Err(Error::grammar("Nested needs at least one field", ast.raw_value.clone()));
    }
    let fields = ast
        .children
        .iter()
        .map(|child| {
            let name = child.field.clone().ok_or_else(|| {
                Error::grammar("Nested field needs a name", child.raw_value.clone())
            })?;
            Ok((name, registry.resolve(child, settings)?))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Type::Nested { fields })
}

fn map(ast: &TypeAst, registry: &TypeRegistry, settings: &TypeSettings) -> Result<Type> {
    expect_arg_count(ast, 2, 2)?;
    let key_type = registry.resolve(&ast.children[0], settings)?;
    let value_type = registry.resolve(&ast.children[1], settings)?;
    Ok(Type::map(key_type, value_type))
}

fn variant(ast: &TypeAst, registry: &TypeRegistry, settings: &TypeSettings) -> Result<Type> {
    if ast.children.is_empty() || ast.children.len() > 255 {
        return Err(Error::grammar(
            "Variant expects 1 to 255 types",
            ast.raw_value.clone(),
        ));
    }
    let variants = ast
        .children
        .iter()
        .map(|child| registry.resolve(child, settings))
        .collect::<Result<Vec<_>>>()?;
    Ok(Type::variant(variants))
}

fn simple_aggregate_function(
    ast: &TypeAst,
    registry: &TypeRegistry,
    settings: &TypeSettings,
) -> Result<Type> {
    expect_arg_count(ast, 2, 2)?;
    let function = &ast.children[0];
    if function.kind != AstKind::Type {
        return Err(Error::grammar(
            "Expected an aggregate function name",
            function.raw_value.clone(),
        ));
    }
    Ok(Type::SimpleAggregateFunction {
        function: function.raw_value.clone(),
        nested_type: Box::new(registry.resolve(&ast.children[1], settings)?),
    })
}

fn object(ast: &TypeAst, _: &TypeRegistry, _: &TypeSettings) -> Result<Type> {
    expect_arg_count(ast, 1, 1)?;
    if !string_arg(ast, 0)?.eq_ignore_ascii_case("json") {
        return Err(Error::UnknownType(ast.raw_value.clone()));
    }
    Ok(Type::Simple(TypeCode::Object))
}

fn dynamic(ast: &TypeAst, _: &TypeRegistry, _: &TypeSettings) -> Result<Type> {
    // Only `max_types = N` style settings are allowed; they do not change
    // the wire format.
    if let Some(child) = ast.children.iter().find(|c| c.kind != AstKind::Assign) {
        return Err(Error::grammar(
            "Dynamic accepts only name = value settings",
            child.raw_value.clone(),
        ));
    }
    Ok(Type::dynamic())
}

/// Concurrent cache of resolved types keyed by descriptor string.
///
/// All entries are resolved with the cache's own [`TypeSettings`].
#[derive(Debug)]
pub struct TypeCache {
    settings: TypeSettings,
    entries: RwLock<HashMap<String, TypeRef>>,
}

impl TypeCache {
    pub fn new(settings: TypeSettings) -> Self {
        Self { settings, entries: RwLock::new(HashMap::new()) }
    }

    pub fn settings(&self) -> &TypeSettings {
        &self.settings
    }

    /// Return the cached type for `type_str`, parsing it on first use.
    pub fn get_or_parse(&self, type_str: &str) -> Result<TypeRef> {
        if let Some(cached) = self.entries.read().get(type_str) {
            return Ok(Arc::clone(cached));
        }

        debug!(type_name = type_str, "type cache miss");
        let parsed = Arc::new(TypeRegistry::global().parse(type_str, &self.settings)?);

        let mut entries = self.entries.write();
        let entry = entries.entry(type_str.to_string()).or_insert(parsed);
        Ok(Arc::clone(entry))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for TypeCache {
    fn default() -> Self {
        Self::new(TypeSettings::default())
    }
}
