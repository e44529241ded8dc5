//! Sampling frequencies and period arithmetic
//!
//! A [`Frequency`] is a unit plus an integer multiple. Fixed units (seconds up to
//! weeks) step by exact durations, calendar units (months, quarters, years) step
//! by calendar months anchored at the series start, and business days count
//! weekdays only.

use super::timestamp::TimePoint;
use crate::error::{ForecastError, Result};
use chrono::{Datelike, Months, NaiveDate, TimeDelta, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound on the number of points a regularized grid may contain
pub const MAX_GRID_LEN: usize = 10_000_000;

const MILLIS_PER_SECOND: i64 = 1_000;
const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 3_600;
const SECONDS_PER_DAY: i64 = 86_400;

/// Base unit of a sampling frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrequencyUnit {
    Second,
    Minute,
    Hour,
    Day,
    /// Monday to Friday
    BusinessDay,
    Week,
    Month,
    Quarter,
    Year,
}

impl FrequencyUnit {
    /// Short offset alias understood by forecasting backends
    pub fn alias(&self) -> &'static str {
        match self {
            FrequencyUnit::Second => "S",
            FrequencyUnit::Minute => "T",
            FrequencyUnit::Hour => "H",
            FrequencyUnit::Day => "D",
            FrequencyUnit::BusinessDay => "B",
            FrequencyUnit::Week => "W",
            FrequencyUnit::Month => "M",
            FrequencyUnit::Quarter => "Q",
            FrequencyUnit::Year => "A",
        }
    }

    fn fixed_millis(&self) -> Option<i64> {
        let seconds = match self {
            FrequencyUnit::Second => 1,
            FrequencyUnit::Minute => SECONDS_PER_MINUTE,
            FrequencyUnit::Hour => SECONDS_PER_HOUR,
            FrequencyUnit::Day => SECONDS_PER_DAY,
            FrequencyUnit::Week => 7 * SECONDS_PER_DAY,
            _ => return None,
        };
        Some(seconds * MILLIS_PER_SECOND)
    }

    fn calendar_months(&self) -> Option<i64> {
        match self {
            FrequencyUnit::Month => Some(1),
            FrequencyUnit::Quarter => Some(3),
            FrequencyUnit::Year => Some(12),
            _ => None,
        }
    }
}

/// A sampling period: a unit repeated `multiple` times
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Frequency {
    unit: FrequencyUnit,
    multiple: u32,
}

impl Frequency {
    /// Create a frequency; a zero multiple is treated as one
    pub fn new(unit: FrequencyUnit, multiple: u32) -> Self {
        Self {
            unit,
            multiple: multiple.max(1),
        }
    }

    pub fn hourly() -> Self {
        Self::new(FrequencyUnit::Hour, 1)
    }

    pub fn daily() -> Self {
        Self::new(FrequencyUnit::Day, 1)
    }

    pub fn unit(&self) -> FrequencyUnit {
        self.unit
    }

    pub fn multiple(&self) -> u32 {
        self.multiple
    }

    /// Offset alias, e.g. `"H"`, `"15T"`, `"B"`
    pub fn alias(&self) -> String {
        if self.multiple == 1 {
            self.unit.alias().to_string()
        } else {
            format!("{}{}", self.multiple, self.unit.alias())
        }
    }

    /// Move `t` by `periods` whole periods (negative moves backwards).
    /// Returns `None` on calendar overflow.
    pub fn advance(&self, t: TimePoint, periods: i64) -> Option<TimePoint> {
        let steps = periods.checked_mul(self.multiple as i64)?;

        if let Some(millis) = self.unit.fixed_millis() {
            let delta = TimeDelta::try_milliseconds(millis.checked_mul(steps)?)?;
            return t.checked_add_signed(delta);
        }

        if let Some(months) = self.unit.calendar_months() {
            let total = months.checked_mul(steps)?;
            let magnitude = Months::new(u32::try_from(total.unsigned_abs()).ok()?);
            return if total >= 0 {
                t.checked_add_months(magnitude)
            } else {
                t.checked_sub_months(magnitude)
            };
        }

        let index = business_index(t.date()).checked_add(steps)?;
        business_date(index).map(|date| date.and_time(t.time()))
    }

    /// Number of whole periods from `start` to `t`, rounded towards negative
    /// infinity. Negative when `t` precedes `start`.
    pub fn periods_between(&self, start: TimePoint, t: TimePoint) -> i64 {
        let multiple = self.multiple as i64;

        if let Some(millis) = self.unit.fixed_millis() {
            let elapsed = (t - start).num_milliseconds();
            return elapsed.div_euclid(millis * multiple);
        }

        if let Some(months) = self.unit.calendar_months() {
            let raw_months = (t.year() as i64 - start.year() as i64) * 12
                + (t.month() as i64 - start.month() as i64);
            let mut n = raw_months.div_euclid(months * multiple);
            // Day-of-month and time-of-day can push the boundary by one period
            while self.advance(start, n).map_or(false, |p| p > t) {
                n -= 1;
            }
            while self.advance(start, n + 1).map_or(false, |p| p <= t) {
                n += 1;
            }
            return n;
        }

        (business_index(t.date()) - business_index(start.date())).div_euclid(multiple)
    }

    /// Contiguous grid from `first` to `last` inclusive, stepping one period
    /// at a time from `first`
    pub fn grid(&self, first: TimePoint, last: TimePoint) -> Result<Vec<TimePoint>> {
        if last < first {
            return Err(ForecastError::DataError(format!(
                "grid end {} precedes grid start {}",
                last, first
            )));
        }

        let span = self.periods_between(first, last);
        if span < 0 || span as u64 >= MAX_GRID_LEN as u64 {
            return Err(ForecastError::DataError(format!(
                "a {} grid from {} to {} would exceed {} points",
                self, first, last, MAX_GRID_LEN
            )));
        }

        let mut points = Vec::with_capacity(span as usize + 1);
        for k in 0..=span {
            match self.advance(first, k) {
                Some(point) if point <= last => points.push(point),
                _ => break,
            }
        }
        Ok(points)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.alias())
    }
}

/// Canonical frequency plus the frequency used to build reindex grids.
///
/// The two differ when the natural cadence has no contiguous calendar of its
/// own, e.g. business-day data reindexed on a daily grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyPair {
    pub canonical: Frequency,
    pub reindex: Frequency,
}

impl FrequencyPair {
    /// Pair whose reindex frequency equals the canonical one
    pub fn uniform(frequency: Frequency) -> Self {
        Self {
            canonical: frequency,
            reindex: frequency,
        }
    }
}

/// Classify the delta between two consecutive timestamps
pub fn infer_frequency(first: TimePoint, second: TimePoint) -> Result<FrequencyPair> {
    let delta_ms = (second - first).num_milliseconds();
    if delta_ms <= 0 {
        return Err(ForecastError::DataError(format!(
            "cannot infer a frequency from non-increasing timestamps {} and {}",
            first, second
        )));
    }

    for (unit, months) in [
        (FrequencyUnit::Year, 12),
        (FrequencyUnit::Quarter, 3),
        (FrequencyUnit::Month, 1),
    ] {
        if first.checked_add_months(Months::new(months)) == Some(second) {
            return Ok(FrequencyPair::uniform(Frequency::new(unit, 1)));
        }
    }

    if delta_ms % MILLIS_PER_SECOND != 0 {
        return Err(ForecastError::DataError(format!(
            "sub-second sampling period of {}ms is not supported",
            delta_ms
        )));
    }
    let seconds = delta_ms / MILLIS_PER_SECOND;

    if seconds % SECONDS_PER_DAY == 0 {
        let days = seconds / SECONDS_PER_DAY;
        let pair = match days {
            365 | 366 => FrequencyPair::uniform(Frequency::new(FrequencyUnit::Year, 1)),
            89..=92 => FrequencyPair::uniform(Frequency::new(FrequencyUnit::Quarter, 1)),
            28..=31 => FrequencyPair::uniform(Frequency::new(FrequencyUnit::Month, 1)),
            3 if first.weekday() == Weekday::Fri => FrequencyPair {
                canonical: Frequency::new(FrequencyUnit::BusinessDay, 1),
                reindex: Frequency::daily(),
            },
            d if d % 7 == 0 => {
                FrequencyPair::uniform(Frequency::new(FrequencyUnit::Week, multiple(d / 7)?))
            }
            d => FrequencyPair::uniform(Frequency::new(FrequencyUnit::Day, multiple(d)?)),
        };
        return Ok(pair);
    }

    let frequency = if seconds % SECONDS_PER_HOUR == 0 {
        Frequency::new(FrequencyUnit::Hour, multiple(seconds / SECONDS_PER_HOUR)?)
    } else if seconds % SECONDS_PER_MINUTE == 0 {
        Frequency::new(FrequencyUnit::Minute, multiple(seconds / SECONDS_PER_MINUTE)?)
    } else {
        Frequency::new(FrequencyUnit::Second, multiple(seconds)?)
    };
    Ok(FrequencyPair::uniform(frequency))
}

/// Infer from the first two distinct timestamps of a series, in sorted order.
///
/// Only one pair is sampled; the cadence is assumed to hold everywhere else.
pub fn infer_from_timestamps(timestamps: &[TimePoint]) -> Result<FrequencyPair> {
    let mut sorted = timestamps.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    if sorted.len() < 2 {
        return Err(ForecastError::InsufficientData {
            needed: 2,
            got: sorted.len(),
        });
    }
    infer_frequency(sorted[0], sorted[1])
}

fn multiple(count: i64) -> Result<u32> {
    u32::try_from(count).map_err(|_| {
        ForecastError::DataError(format!("sampling period multiple {} is too large", count))
    })
}

/// Weekday index counted from Monday 0001-01-01; weekends collapse onto the
/// preceding Friday
fn business_index(date: NaiveDate) -> i64 {
    let days = date.num_days_from_ce() as i64 - 1;
    let weeks = days.div_euclid(7);
    let weekday = days.rem_euclid(7);
    weeks * 5 + weekday.min(4)
}

fn business_date(index: i64) -> Option<NaiveDate> {
    let days = index.div_euclid(5) * 7 + index.rem_euclid(5);
    NaiveDate::from_num_days_from_ce_opt(i32::try_from(days + 1).ok()?)
}
