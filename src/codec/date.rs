//! Date, Date32, DateTime and DateTime64 codecs.
//!
//! Dates are day counts since 1970-01-01 (u16 for Date, i32 for Date32).
//! DateTime is u32 seconds since the epoch; DateTime64(P) is i64 ticks of
//! 10^-P seconds. Decoded timestamps carry the column's timezone.

use super::numeric::read_array;
use crate::{
    types::MAX_DATETIME64_PRECISION,
    Error,
    Result,
    Value,
};
use bytes::{
    BufMut,
    BytesMut,
};
use chrono::{
    DateTime,
    Datelike,
    Duration,
    LocalResult,
    NaiveDate,
    NaiveDateTime,
    TimeZone as _,
    Timelike,
};
use chrono_tz::Tz;

/// `NaiveDate::num_days_from_ce` of 1970-01-01.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

fn date_from_days(days: i32) -> Result<NaiveDate> {
    days.checked_add(EPOCH_DAYS_FROM_CE)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| Error::DecodingFormat(format!("Day number {} is out of range", days)))
}

fn days_since_epoch(date: NaiveDate) -> i64 {
    date.num_days_from_ce() as i64 - EPOCH_DAYS_FROM_CE as i64
}

/// Interpret a wall-clock time in `tz`. Ambiguous times take the earlier
/// instant; times skipped by a DST jump move forward by one hour.
pub(crate) fn localize(naive: &NaiveDateTime, tz: Tz) -> Result<DateTime<Tz>> {
    match tz.from_local_datetime(naive) {
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest),
        LocalResult::None => tz
            .from_local_datetime(&(*naive + Duration::hours(1)))
            .earliest()
            .ok_or_else(|| {
                Error::UnsupportedConversion(format!(
                    "{} does not exist in timezone {}",
                    naive,
                    tz.name()
                ))
            }),
    }
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    const FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
    FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
}

/// Convert a value to an instant, reading naive times in `tz`.
pub(crate) fn coerce_datetime(type_name: &str, value: &Value, tz: Tz) -> Result<DateTime<Tz>> {
    match value {
        Value::DateTime(dt) => Ok(*dt),
        Value::NaiveDateTime(naive) => localize(naive, tz),
        Value::Date(date) => localize(&date.and_time(chrono::NaiveTime::MIN), tz),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Ok(dt.with_timezone(&tz));
            }
            let naive = parse_naive(s).ok_or_else(|| {
                Error::UnsupportedConversion(format!("'{}' is not a valid {}", s, type_name))
            })?;
            localize(&naive, tz)
        }
        other => {
            let seconds = other
                .as_bigint()
                .and_then(|v| num_traits::ToPrimitive::to_i64(&v))
                .ok_or_else(|| {
                    Error::UnsupportedConversion(format!(
                        "Cannot convert {} to {}",
                        other.kind(),
                        type_name
                    ))
                })?;
            tz.timestamp_opt(seconds, 0)
                .single()
                .ok_or_else(|| Error::overflow(type_name, seconds))
        }
    }
}

/// Convert a value to a calendar date. A zoned timestamp keeps the day in
/// its own zone and unix seconds are read in `tz`.
pub(crate) fn coerce_date(type_name: &str, value: &Value, tz: Tz) -> Result<NaiveDate> {
    match value {
        Value::Date(date) => Ok(*date),
        Value::NaiveDateTime(naive) => Ok(naive.date()),
        Value::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            Error::UnsupportedConversion(format!("'{}' is not a valid {}", s, type_name))
        }),
        other => Ok(coerce_datetime(type_name, other, tz)?.date_naive()),
    }
}

pub(crate) fn decode_date(buffer: &mut &[u8]) -> Result<Value> {
    let days = u16::from_le_bytes(read_array(buffer, "Date")?);
    Ok(Value::Date(date_from_days(days as i32)?))
}

pub(crate) fn encode_date(buffer: &mut BytesMut, value: &Value, tz: Tz) -> Result<()> {
    let date = coerce_date("Date", value, tz)?;
    let days = u16::try_from(days_since_epoch(date)).map_err(|_| Error::overflow("Date", date))?;
    buffer.put_u16_le(days);
    Ok(())
}

pub(crate) fn decode_date32(buffer: &mut &[u8]) -> Result<Value> {
    let days = i32::from_le_bytes(read_array(buffer, "Date32")?);
    Ok(Value::Date(date_from_days(days)?))
}

pub(crate) fn encode_date32(buffer: &mut BytesMut, value: &Value, tz: Tz) -> Result<()> {
    let date = coerce_date("Date32", value, tz)?;
    let days =
        i32::try_from(days_since_epoch(date)).map_err(|_| Error::overflow("Date32", date))?;
    buffer.put_i32_le(days);
    Ok(())
}

pub(crate) fn decode_datetime(buffer: &mut &[u8], tz: Tz) -> Result<Value> {
    let seconds = u32::from_le_bytes(read_array(buffer, "DateTime")?);
    tz.timestamp_opt(seconds as i64, 0)
        .single()
        .map(Value::DateTime)
        .ok_or_else(|| Error::DecodingFormat(format!("Invalid timestamp {}", seconds)))
}

pub(crate) fn encode_datetime(buffer: &mut BytesMut, value: &Value, tz: Tz) -> Result<()> {
    let dt = coerce_datetime("DateTime", value, tz)?;
    let seconds =
        u32::try_from(dt.timestamp()).map_err(|_| Error::overflow("DateTime", dt))?;
    buffer.put_u32_le(seconds);
    Ok(())
}

fn ticks_per_second(precision: u32) -> Result<i64> {
    Some(precision)
        .filter(|p| *p <= MAX_DATETIME64_PRECISION)
        .and_then(|p| 10i64.checked_pow(p))
        .ok_or_else(|| {
            Error::InvalidArgument(format!(
                "DateTime64 precision {} exceeds {}",
                precision, MAX_DATETIME64_PRECISION
            ))
        })
}

/// Ticks of 10^-precision seconds since the epoch. Sub-tick digits are
/// truncated. `None` when the instant does not fit in i64 ticks.
pub(crate) fn to_ticks(dt: &DateTime<Tz>, precision: u32) -> Result<Option<i64>> {
    let per_second = ticks_per_second(precision)?;
    let nanos_per_tick = NANOS_PER_SECOND / per_second;
    let ticks = dt.timestamp() as i128 * per_second as i128
        + (dt.timestamp_subsec_nanos() as i64 / nanos_per_tick) as i128;
    Ok(i64::try_from(ticks).ok())
}

pub(crate) fn from_ticks(ticks: i64, precision: u32, tz: Tz) -> Result<Option<DateTime<Tz>>> {
    let per_second = ticks_per_second(precision)?;
    let seconds = ticks.div_euclid(per_second);
    let nanos = ticks.rem_euclid(per_second) * (NANOS_PER_SECOND / per_second);
    Ok(tz.timestamp_opt(seconds, nanos as u32).single())
}

pub(crate) fn decode_datetime64(buffer: &mut &[u8], precision: u32, tz: Tz) -> Result<Value> {
    let ticks = i64::from_le_bytes(read_array(buffer, "DateTime64")?);
    from_ticks(ticks, precision, tz)?
        .map(Value::DateTime)
        .ok_or_else(|| Error::DecodingFormat(format!("Invalid DateTime64 ticks {}", ticks)))
}

pub(crate) fn encode_datetime64(
    buffer: &mut BytesMut,
    value: &Value,
    precision: u32,
    tz: Tz,
) -> Result<()> {
    let type_name = format!("DateTime64({})", precision);
    let dt = coerce_datetime(&type_name, value, tz)?;
    let ticks = to_ticks(&dt, precision)?.ok_or_else(|| Error::overflow(&type_name, dt))?;
    buffer.put_i64_le(ticks);
    Ok(())
}

/// `yyyy-mm-dd hh:mm:ss[.f{precision}]` in the timestamp's own zone.
pub(crate) fn format_datetime(dt: &DateTime<Tz>, precision: u32) -> Result<String> {
    let base = dt.format("%Y-%m-%d %H:%M:%S").to_string();
    if precision == 0 {
        return Ok(base);
    }
    let fraction = dt.nanosecond() as i64 / (NANOS_PER_SECOND / ticks_per_second(precision)?);
    Ok(format!("{}.{:0width$}", base, fraction, width = precision as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{
        TimeZone,
        Utc,
    };

    #[test]
    fn test_date_roundtrip() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let mut buffer = BytesMut::new();
        encode_date(&mut buffer, &Value::Date(date), Tz::UTC).unwrap();
        assert_eq!(u16::from_le_bytes([buffer[0], buffer[1]]), 19782);

        let mut slice = &buffer[..];
        assert_eq!(decode_date(&mut slice).unwrap(), Value::Date(date));
    }

    #[test]
    fn test_date_out_of_range() {
        let date = NaiveDate::from_ymd_opt(1969, 12, 31).unwrap();
        let mut buffer = BytesMut::new();
        assert!(matches!(
            encode_date(&mut buffer, &Value::Date(date), Tz::UTC),
            Err(Error::EncodingOverflow { .. })
        ));
        encode_date32(&mut buffer, &Value::Date(date), Tz::UTC).unwrap();
        assert_eq!(&buffer[..], &(-1i32).to_le_bytes());
    }

    #[test]
    fn test_datetime_in_zone() {
        let tz = Tz::Asia__Tokyo;
        let naive = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let mut buffer = BytesMut::new();
        encode_datetime(&mut buffer, &Value::NaiveDateTime(naive), tz).unwrap();
        assert_eq!(u32::from_le_bytes(buffer[..4].try_into().unwrap()), 1_577_836_800);

        let mut slice = &buffer[..];
        match decode_datetime(&mut slice, tz).unwrap() {
            Value::DateTime(dt) => {
                assert_eq!(dt.naive_local(), naive);
                assert_eq!(dt.timezone(), tz);
            }
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_datetime64_negative_ticks() {
        let dt = Utc.timestamp_opt(-1, 500_000_000).unwrap().with_timezone(&Tz::UTC);
        assert_eq!(to_ticks(&dt, 3).unwrap(), Some(-500));
        assert_eq!(from_ticks(-500, 3, Tz::UTC).unwrap(), Some(dt));
    }

    #[test]
    fn test_datetime64_truncates_sub_tick_digits() {
        let dt = Utc.timestamp_opt(10, 123_456_789).unwrap().with_timezone(&Tz::UTC);
        assert_eq!(to_ticks(&dt, 3).unwrap(), Some(10_123));
        assert_eq!(format_datetime(&dt, 6).unwrap(), "1970-01-01 00:00:10.123456");
    }

    #[test]
    fn test_precision_beyond_nanoseconds_rejected() {
        let dt = Utc.timestamp_opt(10, 0).unwrap().with_timezone(&Tz::UTC);
        for precision in [10, 19, 64, u32::MAX] {
            assert!(matches!(to_ticks(&dt, precision), Err(Error::InvalidArgument(_))));
            assert!(from_ticks(1, precision, Tz::UTC).is_err());
            assert!(format_datetime(&dt, precision).is_err());

            let mut slice: &[u8] = &[1, 0, 0, 0, 0, 0, 0, 0];
            assert!(decode_datetime64(&mut slice, precision, Tz::UTC).is_err());
        }
        assert_eq!(to_ticks(&dt, 9).unwrap(), Some(10_000_000_000));
    }

    #[test]
    fn test_date_from_zoned_timestamp() {
        let tokyo = Tz::Asia__Tokyo.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
        assert_eq!(
            coerce_date("Date", &Value::DateTime(tokyo), Tz::UTC).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        // 2023-12-31 16:00:00 UTC
        assert_eq!(
            coerce_date("Date", &Value::Int64(1_704_038_400), Tz::UTC).unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_dst_gap_moves_forward() {
        let tz = Tz::Europe__Berlin;
        let naive = NaiveDate::from_ymd_opt(2023, 3, 26)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        let dt = localize(&naive, tz).unwrap();
        assert_eq!(dt.naive_local().hour(), 3);
    }

    #[test]
    fn test_string_inputs() {
        let dt = coerce_datetime("DateTime", &Value::from("2020-01-01 00:00:00"), Tz::UTC)
            .unwrap();
        assert_eq!(dt.timestamp(), 1_577_836_800);
        let dt = coerce_datetime("DateTime", &Value::from("2020-01-01T01:00:00+01:00"), Tz::UTC)
            .unwrap();
        assert_eq!(dt.timestamp(), 1_577_836_800);
    }
}
