//! # ClickHouse Type Codec
//!
//! Client-side understanding of the ClickHouse column type system:
//!
//! - [`Type::parse`] turns a descriptor such as `Array(Nullable(Decimal(18, 5)))`
//!   into a [`Type`] tree
//! - [`Type::decode`] and [`Type::encode`] read and write RowBinary values
//! - [`Type::format`] renders a [`Value`] as an inline SQL literal or as an
//!   HTTP query parameter
//! - [`ClickHouseDecimal`] and the 128/256-bit integers carry values the
//!   native Rust numerics cannot hold losslessly
//!
//! Type trees are immutable and `Send + Sync`; build one per distinct type
//! string (see [`TypeCache`]) and share it across threads.
//!
//! ```
//! use bytes::BytesMut;
//! use clickhouse_type_codec::{Type, Value};
//!
//! let ty = Type::parse("Array(Nullable(Int32))").unwrap();
//! let value = Value::Array(vec![Value::Int32(1), Value::Null, Value::Int32(3)]);
//!
//! let mut buffer = BytesMut::new();
//! ty.encode(&mut buffer, &value).unwrap();
//! assert_eq!(&buffer[..], &[3, 0, 1, 0, 0, 0, 1, 0, 3, 0, 0, 0]);
//!
//! let mut slice = &buffer[..];
//! assert_eq!(ty.decode(&mut slice).unwrap(), value);
//! ```

mod codec;
pub mod error;
pub mod format;
pub mod io;
pub mod numeric;
pub mod settings;
pub mod types;
pub mod value;

pub use error::{
    Error,
    Result,
};
pub use format::{
    encode_query_parameter,
    escape_string,
    query_parameter,
    quote_string,
    FormatMode,
};
pub use numeric::{
    ClickHouseDecimal,
    Int128,
    Int256,
    NumberFormat,
    UInt128,
    UInt256,
};
pub use settings::TypeSettings;
pub use types::{
    EnumItem,
    EnumItems,
    TimeZone,
    Type,
    TypeCache,
    TypeCode,
    TypeRef,
    TypeRegistry,
};
pub use value::Value;
