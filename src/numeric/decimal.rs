//! Arbitrary-precision scaled decimal.
//!
//! A [`ClickHouseDecimal`] is `mantissa × 10^-scale` with a [`BigInt`]
//! mantissa, so it can hold every `Decimal256(S)` value without loss.
//! Construction keeps the scale as given: `1.0` and `1.00` are distinct
//! representations of equal values. [`ClickHouseDecimal::normalize`] and
//! [`ClickHouseDecimal::truncate`] are the only operations that shrink it.
//!
//! Addition, subtraction, multiplication and remainder are exact. Division
//! is bounded by a precision argument, see
//! [`ClickHouseDecimal::div_with_precision`].

use crate::{
    Error,
    Result,
};
use num_bigint::BigInt;
use num_traits::{
    Signed,
    ToPrimitive,
    Zero,
};
use std::{
    cmp::Ordering,
    fmt,
    hash::{
        Hash,
        Hasher,
    },
    ops::{
        Add,
        Div,
        Mul,
        Neg,
        Rem,
        Sub,
    },
    str::FromStr,
};

/// Significant digits kept by the `/` operator.
pub const DEFAULT_DIVISION_PRECISION: u32 = 50;

/// Largest precision and scale `rust_decimal::Decimal` can represent.
pub const NATIVE_MAX_PRECISION: u32 = 28;

/// Bits available to a `rust_decimal::Decimal` mantissa.
const NATIVE_MANTISSA_BITS: u64 = 96;

/// Decimal separator and negative sign used for parsing and formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberFormat<'a> {
    pub decimal_separator: &'a str,
    pub negative_sign: &'a str,
}

impl NumberFormat<'static> {
    /// `.` as separator, `-` as negative sign.
    pub const INVARIANT: NumberFormat<'static> =
        NumberFormat { decimal_separator: ".", negative_sign: "-" };
}

impl<'a> NumberFormat<'a> {
    pub const fn new(decimal_separator: &'a str, negative_sign: &'a str) -> Self {
        Self { decimal_separator, negative_sign }
    }
}

impl Default for NumberFormat<'static> {
    fn default() -> Self {
        NumberFormat::INVARIANT
    }
}

/// Arbitrary-precision decimal value.
#[derive(Debug, Clone)]
pub struct ClickHouseDecimal {
    mantissa: BigInt,
    scale: u32,
}

pub(crate) fn pow10(exponent: u32) -> BigInt {
    BigInt::from(10u32).pow(exponent)
}

/// Number of decimal digits in the magnitude of `value`; zero has one digit.
pub(crate) fn digit_count(value: &BigInt) -> u32 {
    if value.is_zero() {
        return 1;
    }
    value.magnitude().to_string().len() as u32
}

impl ClickHouseDecimal {
    pub fn new(mantissa: impl Into<BigInt>, scale: u32) -> Self {
        Self { mantissa: mantissa.into(), scale }
    }

    pub fn zero() -> Self {
        Self::new(0, 0)
    }

    pub fn one() -> Self {
        Self::new(1, 0)
    }

    pub fn mantissa(&self) -> &BigInt {
        &self.mantissa
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn into_parts(self) -> (BigInt, u32) {
        (self.mantissa, self.scale)
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa.is_negative()
    }

    /// -1, 0 or 1.
    pub fn signum(&self) -> i32 {
        if self.mantissa.is_zero() {
            0
        } else if self.mantissa.is_negative() {
            -1
        } else {
            1
        }
    }

    pub fn abs(&self) -> Self {
        Self::new(self.mantissa.abs(), self.scale)
    }

    /// Number of significant digits in the mantissa.
    pub fn precision(&self) -> u32 {
        digit_count(&self.mantissa)
    }

    /// Mantissa at a scale not smaller than `self.scale`.
    fn rescaled(&self, scale: u32) -> BigInt {
        debug_assert!(scale >= self.scale);
        if scale == self.scale {
            self.mantissa.clone()
        } else {
            &self.mantissa * pow10(scale - self.scale)
        }
    }

    /// Mantissa expressed at `scale`, truncating toward zero when `scale`
    /// is smaller than the current one.
    pub fn to_scale(&self, scale: u32) -> BigInt {
        if scale >= self.scale {
            self.rescaled(scale)
        } else {
            &self.mantissa / pow10(self.scale - scale)
        }
    }

    /// Strip trailing zero digits from the fractional part.
    pub fn normalize(&self) -> Self {
        let ten = BigInt::from(10u32);
        let mut mantissa = self.mantissa.clone();
        let mut scale = self.scale;
        while scale > 0 && (&mantissa % &ten).is_zero() {
            mantissa /= &ten;
            scale -= 1;
        }
        Self { mantissa, scale }
    }

    /// Drop least-significant digits until at most `precision` remain.
    ///
    /// Only fractional digits are removed, so `12.345.truncate(1) == 12`.
    pub fn truncate(&self, precision: u32) -> Self {
        let digits = digit_count(&self.mantissa);
        if digits <= precision {
            return self.clone();
        }
        let drop = (digits - precision).min(self.scale);
        Self::new(&self.mantissa / pow10(drop), self.scale - drop)
    }

    /// Largest integer not greater than `self`.
    pub fn floor(&self) -> Self {
        let whole = self.to_scale(0);
        if self.mantissa.is_negative() && whole.clone() * pow10(self.scale) != self.mantissa {
            Self::new(whole - 1, 0)
        } else {
            Self::new(whole, 0)
        }
    }

    /// Divide keeping roughly `precision` significant digits.
    ///
    /// The dividend is shifted left until it carries at least `precision`
    /// more digits than the divisor, the mantissas are integer-divided and
    /// the quotient is normalized.
    pub fn div_with_precision(&self, rhs: &Self, precision: u32) -> Result<Self> {
        if rhs.mantissa.is_zero() {
            return Err(Error::InvalidArgument("Decimal division by zero".to_string()));
        }
        if self.mantissa.is_zero() {
            return Ok(Self::zero());
        }

        let bias = (precision + digit_count(&rhs.mantissa))
            .saturating_sub(digit_count(&self.mantissa));
        let quotient = (&self.mantissa * pow10(bias)) / &rhs.mantissa;
        let scale = i64::from(self.scale) + i64::from(bias) - i64::from(rhs.scale);

        let result = if scale >= 0 {
            Self::new(quotient, scale as u32)
        } else {
            Self::new(quotient * pow10((-scale) as u32), 0)
        };
        Ok(result.normalize())
    }

    /// `None` on division by zero.
    pub fn checked_div(&self, rhs: &Self) -> Option<Self> {
        self.div_with_precision(rhs, DEFAULT_DIVISION_PRECISION).ok()
    }

    /// `None` on division by zero.
    pub fn checked_rem(&self, rhs: &Self) -> Option<Self> {
        if rhs.mantissa.is_zero() {
            return None;
        }
        let scale = self.scale.max(rhs.scale);
        Some(Self::new(self.rescaled(scale) % rhs.rescaled(scale), scale))
    }

    /// Closest `f64`; exact whenever the textual form round-trips.
    pub fn to_f64(&self) -> f64 {
        self.to_string().parse::<f64>().unwrap_or(f64::NAN)
    }

    /// Convert from `f64` using its shortest round-trip decimal form, so
    /// `0.1` becomes `0.1` and subnormals keep every significant digit.
    pub fn from_f64(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(Error::UnsupportedConversion(format!(
                "{} has no decimal representation",
                value
            )));
        }

        // `{:e}` prints the shortest digits that parse back to `value`.
        let text = format!("{:e}", value);
        let invalid =
            || Error::UnsupportedConversion(format!("Cannot convert {} to decimal", value));
        let (significand, exponent) = text.split_once('e').ok_or_else(invalid)?;
        let exponent: i64 = exponent.parse().map_err(|_| invalid())?;
        let fraction_digits = significand.split_once('.').map_or(0, |(_, f)| f.len()) as i64;
        let digits: String = significand.chars().filter(|c| *c != '.').collect();
        let mantissa: BigInt = digits.parse().map_err(|_| invalid())?;

        let shift = exponent - fraction_digits;
        if shift >= 0 {
            Ok(Self::new(mantissa * pow10(shift as u32), 0))
        } else {
            Ok(Self::new(mantissa, (-shift) as u32))
        }
    }

    /// Parse using the given separator and negative sign.
    pub fn parse_with_format(input: &str, format: &NumberFormat<'_>) -> Result<Self> {
        let invalid = || Error::InvalidArgument(format!("Invalid decimal: '{}'", input));

        let trimmed = input.trim();
        let (negative, body) = if !format.negative_sign.is_empty()
            && trimmed.starts_with(format.negative_sign)
        {
            (true, &trimmed[format.negative_sign.len()..])
        } else if let Some(rest) = trimmed.strip_prefix('+') {
            (false, rest)
        } else {
            (false, trimmed)
        };

        let (whole, fraction) = match body.find(format.decimal_separator) {
            Some(pos) if !format.decimal_separator.is_empty() => {
                (&body[..pos], &body[pos + format.decimal_separator.len()..])
            }
            _ => (body, ""),
        };

        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction)
        {
            return Err(invalid());
        }

        let digits = format!("{}{}", whole, fraction);
        let magnitude = BigInt::parse_bytes(digits.as_bytes(), 10).ok_or_else(invalid)?;
        let mantissa = if negative { -magnitude } else { magnitude };
        Ok(Self::new(mantissa, fraction.len() as u32))
    }

    /// Render using the given separator and negative sign.
    pub fn to_string_with(&self, format: &NumberFormat<'_>) -> String {
        let digits = self.mantissa.magnitude().to_string();
        let scale = self.scale as usize;

        let mut out = String::with_capacity(digits.len() + scale + 2);
        if self.mantissa.is_negative() {
            out.push_str(format.negative_sign);
        }
        if scale == 0 {
            out.push_str(&digits);
        } else if digits.len() > scale {
            let (whole, fraction) = digits.split_at(digits.len() - scale);
            out.push_str(whole);
            out.push_str(format.decimal_separator);
            out.push_str(fraction);
        } else {
            out.push('0');
            out.push_str(format.decimal_separator);
            out.extend(std::iter::repeat('0').take(scale - digits.len()));
            out.push_str(&digits);
        }
        out
    }
}

impl Default for ClickHouseDecimal {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for ClickHouseDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_with(&NumberFormat::INVARIANT))
    }
}

impl FromStr for ClickHouseDecimal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_with_format(s, &NumberFormat::INVARIANT)
    }
}

impl PartialEq for ClickHouseDecimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ClickHouseDecimal {}

impl PartialOrd for ClickHouseDecimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ClickHouseDecimal {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.scale == other.scale {
            return self.mantissa.cmp(&other.mantissa);
        }
        let scale = self.scale.max(other.scale);
        self.rescaled(scale).cmp(&other.rescaled(scale))
    }
}

impl Hash for ClickHouseDecimal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let normalized = self.normalize();
        normalized.mantissa.hash(state);
        normalized.scale.hash(state);
    }
}

impl<'a, 'b> Add<&'b ClickHouseDecimal> for &'a ClickHouseDecimal {
    type Output = ClickHouseDecimal;

    fn add(self, rhs: &'b ClickHouseDecimal) -> ClickHouseDecimal {
        let scale = self.scale.max(rhs.scale);
        ClickHouseDecimal::new(self.rescaled(scale) + rhs.rescaled(scale), scale)
    }
}

impl<'a, 'b> Sub<&'b ClickHouseDecimal> for &'a ClickHouseDecimal {
    type Output = ClickHouseDecimal;

    fn sub(self, rhs: &'b ClickHouseDecimal) -> ClickHouseDecimal {
        let scale = self.scale.max(rhs.scale);
        ClickHouseDecimal::new(self.rescaled(scale) - rhs.rescaled(scale), scale)
    }
}

impl<'a, 'b> Mul<&'b ClickHouseDecimal> for &'a ClickHouseDecimal {
    type Output = ClickHouseDecimal;

    fn mul(self, rhs: &'b ClickHouseDecimal) -> ClickHouseDecimal {
        ClickHouseDecimal::new(&self.mantissa * &rhs.mantissa, self.scale + rhs.scale)
    }
}

impl<'a, 'b> Div<&'b ClickHouseDecimal> for &'a ClickHouseDecimal {
    type Output = ClickHouseDecimal;

    /// # Panics
    ///
    /// Panics if `rhs` is zero.
    fn div(self, rhs: &'b ClickHouseDecimal) -> ClickHouseDecimal {
        match self.checked_div(rhs) {
            Some(quotient) => quotient,
            None => panic!("attempt to divide by zero"),
        }
    }
}

impl<'a, 'b> Rem<&'b ClickHouseDecimal> for &'a ClickHouseDecimal {
    type Output = ClickHouseDecimal;

    /// # Panics
    ///
    /// Panics if `rhs` is zero.
    fn rem(self, rhs: &'b ClickHouseDecimal) -> ClickHouseDecimal {
        match self.checked_rem(rhs) {
            Some(remainder) => remainder,
            None => panic!("attempt to calculate the remainder with a divisor of zero"),
        }
    }
}

macro_rules! forward_binop {
    ($imp:ident, $method:ident) => {
        impl $imp<ClickHouseDecimal> for ClickHouseDecimal {
            type Output = ClickHouseDecimal;

            fn $method(self, rhs: ClickHouseDecimal) -> ClickHouseDecimal {
                (&self).$method(&rhs)
            }
        }

        impl<'b> $imp<&'b ClickHouseDecimal> for ClickHouseDecimal {
            type Output = ClickHouseDecimal;

            fn $method(self, rhs: &'b ClickHouseDecimal) -> ClickHouseDecimal {
                (&self).$method(rhs)
            }
        }

        impl<'a> $imp<ClickHouseDecimal> for &'a ClickHouseDecimal {
            type Output = ClickHouseDecimal;

            fn $method(self, rhs: ClickHouseDecimal) -> ClickHouseDecimal {
                self.$method(&rhs)
            }
        }
    };
}

forward_binop!(Add, add);
forward_binop!(Sub, sub);
forward_binop!(Mul, mul);
forward_binop!(Div, div);
forward_binop!(Rem, rem);

impl Neg for ClickHouseDecimal {
    type Output = ClickHouseDecimal;

    fn neg(self) -> ClickHouseDecimal {
        ClickHouseDecimal::new(-self.mantissa, self.scale)
    }
}

impl<'a> Neg for &'a ClickHouseDecimal {
    type Output = ClickHouseDecimal;

    fn neg(self) -> ClickHouseDecimal {
        ClickHouseDecimal::new(-&self.mantissa, self.scale)
    }
}

macro_rules! from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ClickHouseDecimal {
                fn from(value: $t) -> Self {
                    ClickHouseDecimal::new(BigInt::from(value), 0)
                }
            }
        )*
    };
}

from_integer!(i8, i16, i32, i64, i128, u8, u16, u32, u64, u128);

impl From<BigInt> for ClickHouseDecimal {
    fn from(value: BigInt) -> Self {
        ClickHouseDecimal::new(value, 0)
    }
}

impl TryFrom<f64> for ClickHouseDecimal {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        ClickHouseDecimal::from_f64(value)
    }
}

impl From<rust_decimal::Decimal> for ClickHouseDecimal {
    fn from(value: rust_decimal::Decimal) -> Self {
        ClickHouseDecimal::new(value.mantissa(), value.scale())
    }
}

impl TryFrom<&ClickHouseDecimal> for rust_decimal::Decimal {
    type Error = Error;

    /// Keeps at most 28 significant digits; fails if the integral part
    /// alone does not fit 96 bits.
    fn try_from(value: &ClickHouseDecimal) -> Result<Self> {
        let mut reduced = value.truncate(NATIVE_MAX_PRECISION);
        if reduced.scale > NATIVE_MAX_PRECISION {
            reduced = ClickHouseDecimal::new(
                reduced.to_scale(NATIVE_MAX_PRECISION),
                NATIVE_MAX_PRECISION,
            );
        }

        let overflow = || {
            Error::DecimalOverflow(format!(
                "{} does not fit into a 96-bit decimal mantissa",
                value
            ))
        };
        if reduced.mantissa.bits() > NATIVE_MANTISSA_BITS {
            return Err(overflow());
        }
        let mantissa = reduced.mantissa.to_i128().ok_or_else(overflow)?;
        rust_decimal::Decimal::try_from_i128_with_scale(mantissa, reduced.scale)
            .map_err(|_| overflow())
    }
}

impl TryFrom<ClickHouseDecimal> for rust_decimal::Decimal {
    type Error = Error;

    fn try_from(value: ClickHouseDecimal) -> Result<Self> {
        rust_decimal::Decimal::try_from(&value)
    }
}
