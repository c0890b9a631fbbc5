//! Numeric types that the native Rust primitives cannot represent
//! losslessly: an arbitrary-precision decimal and 128/256-bit integers.

pub mod decimal;
pub mod wide;

pub use decimal::{
    ClickHouseDecimal,
    NumberFormat,
    DEFAULT_DIVISION_PRECISION,
};
pub use wide::{
    Int128,
    Int256,
    UInt128,
    UInt256,
};
