//! Mapping query timestamps onto forecast offsets
//!
//! An offset counts canonical periods from a group's training start, floored,
//! plus one. Offset 0 is reserved: it never addresses a forecast step, and it
//! is the sentinel every row of an unseen group receives.

use super::frequency::Frequency;
use super::timestamp::TimePoint;

/// Offset assigned to every row of a group absent from training
pub const UNSEEN_GROUP_OFFSET: i64 = 0;

/// Converts query timestamps into offsets relative to a training start
#[derive(Debug, Clone, Copy)]
pub struct IntervalMapper {
    frequency: Frequency,
}

impl IntervalMapper {
    pub fn new(frequency: Frequency) -> Self {
        Self { frequency }
    }

    /// Offset of a single timestamp. A timestamp equal to the training start
    /// maps to 1.
    pub fn offset(&self, timestamp: TimePoint, train_start: TimePoint) -> i64 {
        self.frequency
            .periods_between(train_start, timestamp)
            .saturating_add(1)
    }

    /// One offset per timestamp, in the order given. `None` for the training
    /// start means the group was never seen and yields the sentinel for
    /// every row.
    pub fn offsets(&self, timestamps: &[TimePoint], train_start: Option<TimePoint>) -> Vec<i64> {
        match train_start {
            Some(start) => timestamps.iter().map(|&t| self.offset(t, start)).collect(),
            None => vec![UNSEEN_GROUP_OFFSET; timestamps.len()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeseries::frequency::FrequencyUnit;
    use chrono::{NaiveDate, TimeDelta};

    fn day(d: i64) -> TimePoint {
        NaiveDate::from_ymd_opt(2021, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + TimeDelta::days(d)
    }

    #[test]
    fn test_train_start_maps_to_one() {
        let mapper = IntervalMapper::new(Frequency::daily());
        assert_eq!(mapper.offset(day(0), day(0)), 1);
    }

    #[test]
    fn test_offsets_follow_input_order() {
        let mapper = IntervalMapper::new(Frequency::daily());
        let offsets = mapper.offsets(&[day(12), day(10), day(11)], Some(day(0)));
        assert_eq!(offsets, vec![13, 11, 12]);
    }

    #[test]
    fn test_partial_periods_floor() {
        let mapper = IntervalMapper::new(Frequency::daily());
        let t = day(3) + TimeDelta::hours(23);
        assert_eq!(mapper.offset(t, day(0)), 4);
        assert_eq!(mapper.offset(day(-1), day(0)), 0);
        assert_eq!(mapper.offset(day(-2), day(0)), -1);
    }

    #[test]
    fn test_unseen_group_gets_sentinel() {
        let mapper = IntervalMapper::new(Frequency::new(FrequencyUnit::Week, 1));
        let offsets = mapper.offsets(&[day(0), day(70)], None);
        assert_eq!(offsets, vec![UNSEEN_GROUP_OFFSET; 2]);
    }
}
