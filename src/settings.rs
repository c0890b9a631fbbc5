//! Settings applied while resolving type descriptors.
//!
//! The resolved type tree bakes these in: a `DateTime` without an explicit
//! timezone decodes into `timezone`, and decimal columns decode into
//! [`ClickHouseDecimal`](crate::numeric::ClickHouseDecimal) unless
//! `use_big_decimal` is switched off.

use crate::{
    Error,
    Result,
};
use chrono_tz::Tz;

/// Configuration for the type registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSettings {
    /// Decode decimals to the arbitrary-precision decimal instead of
    /// `rust_decimal::Decimal`.
    pub use_big_decimal: bool,
    /// Timezone assumed for `DateTime`/`DateTime64` columns declared
    /// without one, and for naive timestamps on encode.
    pub timezone: Tz,
}

impl Default for TypeSettings {
    fn default() -> Self {
        Self { use_big_decimal: true, timezone: Tz::UTC }
    }
}

impl TypeSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_big_decimal(mut self, enabled: bool) -> Self {
        self.use_big_decimal = enabled;
        self
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// Set the default timezone by IANA name, e.g. `"Europe/Amsterdam"`.
    pub fn with_timezone_name(self, name: &str) -> Result<Self> {
        let timezone = name.parse::<Tz>().map_err(|_| {
            Error::InvalidArgument(format!("Unknown timezone: {}", name))
        })?;
        Ok(self.with_timezone(timezone))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = TypeSettings::default();
        assert!(settings.use_big_decimal);
        assert_eq!(settings.timezone, Tz::UTC);
    }

    #[test]
    fn test_timezone_by_name() {
        let settings =
            TypeSettings::new().with_timezone_name("Asia/Tokyo").unwrap();
        assert_eq!(settings.timezone, Tz::Asia__Tokyo);

        assert!(TypeSettings::new().with_timezone_name("Mars/Olympus").is_err());
    }
}
