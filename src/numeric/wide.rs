//! Fixed-width 128 and 256-bit integers.
//!
//! Values are stored as little-endian `u64` words (lowest word first) in
//! two's complement, independent of host byte order. Only the operations the
//! codecs need are implemented natively: add/sub with carry propagation,
//! increment/decrement, comparison and [`BigInt`] conversion. Multiplication
//! and division return [`Error::UnsupportedConversion`].

use crate::{
    Error,
    Result,
};
use num_bigint::{
    BigInt,
    Sign,
};
use num_traits::Signed;
use std::{
    cmp::Ordering,
    fmt,
    ops::{
        Add,
        AddAssign,
        Neg,
        Sub,
        SubAssign,
    },
    str::FromStr,
};

macro_rules! wide_integer {
    ($name:ident, $words:expr, $signed:expr) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name {
            words: [u64; $words],
        }

        impl $name {
            pub const BITS: u32 = $words * 64;
            pub const BYTES: usize = $words * 8;
            pub const SIGNED: bool = $signed;

            pub const ZERO: Self = Self { words: [0; $words] };

            pub const ONE: Self = {
                let mut words = [0; $words];
                words[0] = 1;
                Self { words }
            };

            pub const MAX: Self = {
                let mut words = [u64::MAX; $words];
                if $signed {
                    words[$words - 1] = i64::MAX as u64;
                }
                Self { words }
            };

            pub const MIN: Self = {
                let mut words = [0; $words];
                if $signed {
                    words[$words - 1] = 1 << 63;
                }
                Self { words }
            };

            /// Build from little-endian words.
            pub const fn from_words(words: [u64; $words]) -> Self {
                Self { words }
            }

            pub const fn words(&self) -> [u64; $words] {
                self.words
            }

            pub fn from_le_bytes(bytes: [u8; $words * 8]) -> Self {
                let mut words = [0u64; $words];
                for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(8)) {
                    let mut raw = [0u8; 8];
                    raw.copy_from_slice(chunk);
                    *word = u64::from_le_bytes(raw);
                }
                Self { words }
            }

            pub fn to_le_bytes(&self) -> [u8; $words * 8] {
                let mut bytes = [0u8; $words * 8];
                for (chunk, word) in bytes.chunks_exact_mut(8).zip(self.words.iter()) {
                    chunk.copy_from_slice(&word.to_le_bytes());
                }
                bytes
            }

            pub fn is_negative(&self) -> bool {
                $signed && (self.words[$words - 1] >> 63) == 1
            }

            pub fn is_zero(&self) -> bool {
                self.words.iter().all(|w| *w == 0)
            }

            pub fn wrapping_add(self, rhs: Self) -> Self {
                let mut words = [0u64; $words];
                let mut carry = false;
                for i in 0..$words {
                    let (sum, c1) = self.words[i].overflowing_add(rhs.words[i]);
                    let (sum, c2) = sum.overflowing_add(carry as u64);
                    words[i] = sum;
                    carry = c1 || c2;
                }
                Self { words }
            }

            pub fn wrapping_sub(self, rhs: Self) -> Self {
                let mut words = [0u64; $words];
                let mut borrow = false;
                for i in 0..$words {
                    let (diff, b1) = self.words[i].overflowing_sub(rhs.words[i]);
                    let (diff, b2) = diff.overflowing_sub(borrow as u64);
                    words[i] = diff;
                    borrow = b1 || b2;
                }
                Self { words }
            }

            pub fn increment(&self) -> Self {
                self.wrapping_add(Self::ONE)
            }

            pub fn decrement(&self) -> Self {
                self.wrapping_sub(Self::ONE)
            }

            pub fn try_mul(&self, _rhs: &Self) -> Result<Self> {
                Err(Error::UnsupportedConversion(format!(
                    "{} multiplication is not supported",
                    stringify!($name)
                )))
            }

            pub fn try_div(&self, _rhs: &Self) -> Result<Self> {
                Err(Error::UnsupportedConversion(format!(
                    "{} division is not supported",
                    stringify!($name)
                )))
            }

            pub fn to_bigint(&self) -> BigInt {
                let bytes = self.to_le_bytes();
                if $signed {
                    BigInt::from_signed_bytes_le(&bytes)
                } else {
                    BigInt::from_bytes_le(Sign::Plus, &bytes)
                }
            }

            /// Fails with [`Error::IntegerOverflow`] when `value` is out of
            /// range.
            pub fn from_bigint(value: &BigInt) -> Result<Self> {
                let overflow = || {
                    Error::IntegerOverflow(format!(
                        "{} is out of range for {}",
                        value,
                        stringify!($name)
                    ))
                };

                let (bytes, fill) = if $signed {
                    let fill = if value.is_negative() { 0xFF } else { 0x00 };
                    (value.to_signed_bytes_le(), fill)
                } else {
                    if value.is_negative() {
                        return Err(overflow());
                    }
                    (value.to_bytes_le().1, 0x00)
                };
                if bytes.len() > Self::BYTES {
                    return Err(overflow());
                }

                let mut buffer = [fill; $words * 8];
                buffer[..bytes.len()].copy_from_slice(&bytes);
                Ok(Self::from_le_bytes(buffer))
            }

            fn from_u128_bits(value: u128) -> Self {
                let mut words = [0u64; $words];
                words[0] = value as u64;
                words[1] = (value >> 64) as u64;
                Self { words }
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> Ordering {
                let top = $words - 1;
                let high = if $signed {
                    (self.words[top] as i64).cmp(&(other.words[top] as i64))
                } else {
                    self.words[top].cmp(&other.words[top])
                };
                if high != Ordering::Equal {
                    return high;
                }
                for i in (0..top).rev() {
                    match self.words[i].cmp(&other.words[i]) {
                        Ordering::Equal => continue,
                        ordering => return ordering,
                    }
                }
                Ordering::Equal
            }
        }

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Add for $name {
            type Output = $name;

            fn add(self, rhs: $name) -> $name {
                self.wrapping_add(rhs)
            }
        }

        impl Sub for $name {
            type Output = $name;

            fn sub(self, rhs: $name) -> $name {
                self.wrapping_sub(rhs)
            }
        }

        impl AddAssign for $name {
            fn add_assign(&mut self, rhs: $name) {
                *self = self.wrapping_add(rhs);
            }
        }

        impl SubAssign for $name {
            fn sub_assign(&mut self, rhs: $name) {
                *self = self.wrapping_sub(rhs);
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.to_bigint(), f)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_bigint())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                let value = BigInt::from_str(s.trim()).map_err(|_| {
                    Error::InvalidArgument(format!(
                        "Invalid {}: '{}'",
                        stringify!($name),
                        s
                    ))
                })?;
                Self::from_bigint(&value)
            }
        }

        impl TryFrom<&BigInt> for $name {
            type Error = Error;

            fn try_from(value: &BigInt) -> Result<Self> {
                Self::from_bigint(value)
            }
        }

        impl From<$name> for BigInt {
            fn from(value: $name) -> BigInt {
                value.to_bigint()
            }
        }
    };
}

macro_rules! from_signed {
    ($name:ident: $($t:ty),*) => {
        $(
            impl From<$t> for $name {
                fn from(value: $t) -> Self {
                    let value = value as i128;
                    let mut result = Self::from_u128_bits(value as u128);
                    if value < 0 {
                        // Sign-extend past the low 128 bits.
                        result.words[2..].fill(u64::MAX);
                    }
                    result
                }
            }
        )*
    };
}

macro_rules! from_unsigned {
    ($name:ident: $($t:ty),*) => {
        $(
            impl From<$t> for $name {
                fn from(value: $t) -> Self {
                    Self::from_u128_bits(value as u128)
                }
            }
        )*
    };
}

macro_rules! signed_neg {
    ($name:ident) => {
        impl Neg for $name {
            type Output = $name;

            fn neg(self) -> $name {
                $name::ZERO.wrapping_sub(self)
            }
        }
    };
}

wide_integer!(Int128, 2, true);
wide_integer!(UInt128, 2, false);
wide_integer!(Int256, 4, true);
wide_integer!(UInt256, 4, false);

from_signed!(Int128: i8, i16, i32, i64, i128);
from_unsigned!(Int128: u8, u16, u32, u64);
from_unsigned!(UInt128: u8, u16, u32, u64, u128);
from_signed!(Int256: i8, i16, i32, i64, i128);
from_unsigned!(Int256: u8, u16, u32, u64, u128);
from_unsigned!(UInt256: u8, u16, u32, u64, u128);

signed_neg!(Int128);
signed_neg!(Int256);

impl From<Int128> for i128 {
    fn from(value: Int128) -> i128 {
        (value.words[0] as u128 | (value.words[1] as u128) << 64) as i128
    }
}

impl From<UInt128> for u128 {
    fn from(value: UInt128) -> u128 {
        value.words[0] as u128 | (value.words[1] as u128) << 64
    }
}

impl From<Int128> for Int256 {
    fn from(value: Int128) -> Int256 {
        Int256::from(i128::from(value))
    }
}

impl From<UInt128> for Int256 {
    fn from(value: UInt128) -> Int256 {
        Int256::from(u128::from(value))
    }
}

impl From<UInt128> for UInt256 {
    fn from(value: UInt128) -> UInt256 {
        UInt256::from(u128::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::One;

    #[test]
    fn test_extremes() {
        let two = BigInt::from(2);
        assert_eq!(Int128::MAX.to_bigint(), two.pow(127) - 1);
        assert_eq!(Int128::MIN.to_bigint(), -two.pow(127));
        assert_eq!(UInt128::MAX.to_bigint(), two.pow(128) - 1);
        assert_eq!(Int256::MIN.to_bigint(), -two.pow(255));
        assert_eq!(UInt256::MAX.to_bigint(), two.pow(256) - 1);
    }

    #[test]
    fn test_carry_and_borrow() {
        let low_max = Int128::from_words([u64::MAX, 0]);
        assert_eq!(low_max.increment(), Int128::from_words([0, 1]));
        assert_eq!(Int128::from_words([0, 1]).decrement(), low_max);

        assert_eq!(Int128::from(-1).increment(), Int128::ZERO);
        assert_eq!(Int128::ZERO.decrement(), Int128::from(-1));
        assert_eq!(Int128::MAX.increment(), Int128::MIN);
        assert_eq!(UInt256::MAX.increment(), UInt256::ZERO);
    }

    #[test]
    fn test_signed_ordering() {
        assert!(Int128::from(-1) < Int128::ZERO);
        assert!(Int128::MIN < Int128::from(i64::MIN));
        assert!(Int128::from_words([0, 1]) > Int128::from_words([u64::MAX, 0]));
        assert!(UInt128::from(u128::MAX) > UInt128::ONE);
        assert!(Int256::from(-5) < Int256::from(3));
    }

    #[test]
    fn test_bigint_overflow() {
        let two = BigInt::from(2);
        assert!(matches!(
            Int128::from_bigint(&two.pow(127)),
            Err(Error::IntegerOverflow(_))
        ));
        assert!(Int128::from_bigint(&(-two.pow(127) - BigInt::one())).is_err());
        assert!(UInt128::from_bigint(&BigInt::from(-1)).is_err());
        assert!(UInt128::from_bigint(&two.pow(128)).is_err());
        assert!(UInt128::from_bigint(&(two.pow(128) - 1)).is_ok());
    }

    #[test]
    fn test_sign_extension() {
        let value = Int256::from_bigint(&BigInt::from(-2)).unwrap();
        assert_eq!(value.words(), [u64::MAX - 1, u64::MAX, u64::MAX, u64::MAX]);
        assert_eq!(Int256::from(-2i64), value);
        assert_eq!(Int256::from(Int128::from(-2)), value);
        assert_eq!(Int128::from(-1i8).words(), [u64::MAX, u64::MAX]);
        assert_eq!(
            Int256::from(i128::MIN).words(),
            [0, 1 << 63, u64::MAX, u64::MAX]
        );
        assert_eq!(Int256::from(5i32).words(), [5, 0, 0, 0]);
    }

    #[test]
    fn test_native_roundtrip() {
        for v in [0i128, 1, -1, i128::MAX, i128::MIN, 1 << 70] {
            assert_eq!(i128::from(Int128::from(v)), v);
        }
        assert_eq!(u128::from(UInt128::from(u128::MAX)), u128::MAX);
    }

    #[test]
    fn test_unsupported_ops() {
        let a = Int128::from(6);
        assert!(matches!(
            a.try_mul(&Int128::from(7)),
            Err(Error::UnsupportedConversion(_))
        ));
        assert!(a.try_div(&Int128::from(2)).is_err());
    }

    #[test]
    fn test_display_and_parse() {
        let v: Int128 = "-170141183460469231731687303715884105728".parse().unwrap();
        assert_eq!(v, Int128::MIN);
        assert_eq!(v.to_string(), "-170141183460469231731687303715884105728");
        assert_eq!(-Int128::from(5), Int128::from(-5));
        assert!("12x".parse::<UInt256>().is_err());
    }
}
