//! Timestamp decoding

use crate::error::{ForecastError, Result};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Absolute, timezone-free point in time (UTC wall clock)
pub type TimePoint = NaiveDateTime;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// How raw numeric timestamp values are encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampEncoding {
    /// 1-based day counts: day 1 is 1970-01-01
    DayCount,
    /// Seconds since the Unix epoch, fractional seconds allowed
    EpochSeconds,
}

impl TimestampEncoding {
    /// Decode a raw value into a [`TimePoint`]
    pub fn decode(&self, raw: f64) -> Result<TimePoint> {
        if !raw.is_finite() {
            return Err(ForecastError::DataError(format!(
                "timestamp value {} is not finite",
                raw
            )));
        }

        let seconds = match self {
            TimestampEncoding::DayCount => (raw.floor() - 1.0) * SECONDS_PER_DAY,
            TimestampEncoding::EpochSeconds => raw,
        };
        from_epoch_seconds(seconds)
    }
}

/// Convert fractional epoch seconds to a [`TimePoint`]
pub fn from_epoch_seconds(seconds: f64) -> Result<TimePoint> {
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| {
            ForecastError::DataError(format!("timestamp {} is out of range", seconds))
        })
}

/// Whole epoch seconds of a [`TimePoint`]
pub fn to_epoch_seconds(t: TimePoint) -> i64 {
    t.and_utc().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_day_count_is_one_based() {
        let t = TimestampEncoding::DayCount.decode(1.0).unwrap();
        let expected = NaiveDate::from_ymd_opt(1970, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(t, expected);

        let t = TimestampEncoding::DayCount.decode(32.0).unwrap();
        assert_eq!(t.date(), NaiveDate::from_ymd_opt(1970, 2, 1).unwrap());
    }

    #[test]
    fn test_epoch_seconds() {
        let t = TimestampEncoding::EpochSeconds.decode(1_577_836_800.0).unwrap();
        let expected = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(t, expected);
        assert_eq!(to_epoch_seconds(t), 1_577_836_800);
    }

    #[test]
    fn test_fractional_seconds() {
        let t = TimestampEncoding::EpochSeconds.decode(10.5).unwrap();
        assert_eq!(to_epoch_seconds(t), 10);
        assert_eq!(t.and_utc().timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(TimestampEncoding::EpochSeconds.decode(f64::NAN).is_err());
        assert!(TimestampEncoding::DayCount.decode(f64::INFINITY).is_err());
    }
}
