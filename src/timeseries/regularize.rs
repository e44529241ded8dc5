//! Series regularization
//!
//! Resamples one group's rows onto a uniform grid: rows are sorted, duplicate
//! timestamps dropped (first occurrence wins), the table is reindexed onto a
//! contiguous grid, real-valued features are linearly interpolated across gaps,
//! categorical features are forward-filled, and target gaps stay missing.

use super::frequency::{FrequencyPair, MAX_GRID_LEN};
use super::timestamp::TimePoint;
use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2, ArrayViewMut1, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One group's rows before regularization, in input order.
/// Missing numeric values are NaN.
#[derive(Debug, Clone)]
pub struct RawSeries {
    pub timestamps: Vec<TimePoint>,
    pub target: Vec<f64>,
    /// rows × real-valued feature columns
    pub real: Array2<f64>,
    /// One vector per categorical column
    pub categorical: Vec<Vec<Option<String>>>,
}

impl RawSeries {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    fn validate(&self) -> Result<()> {
        let n = self.len();
        let mismatch = |what: &str, actual: usize| ForecastError::ShapeError {
            expected: format!("{} {} values", n, what),
            actual: actual.to_string(),
        };

        if self.target.len() != n {
            return Err(mismatch("target", self.target.len()));
        }
        if self.real.nrows() != n {
            return Err(mismatch("real feature", self.real.nrows()));
        }
        if let Some(column) = self.categorical.iter().find(|c| c.len() != n) {
            return Err(mismatch("categorical", column.len()));
        }
        Ok(())
    }
}

/// A regularized series: strictly increasing, gap-free timestamps at the
/// reindex frequency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesRecord {
    pub timestamps: Vec<TimePoint>,
    /// NaN marks a gap the model is expected to learn through
    #[serde(with = "super::nan_serde::array1")]
    pub target: Array1<f64>,
    /// rows × real-valued feature columns
    #[serde(with = "super::nan_serde::array2")]
    pub real: Array2<f64>,
    /// One vector per categorical column
    pub categorical: Vec<Vec<Option<String>>>,
}

impl SeriesRecord {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// First regularized timestamp
    pub fn start(&self) -> Option<TimePoint> {
        self.timestamps.first().copied()
    }

    /// Last regularized timestamp
    pub fn end(&self) -> Option<TimePoint> {
        self.timestamps.last().copied()
    }

    /// Number of observed (non-gap) target values
    pub fn observed_targets(&self) -> usize {
        self.target.iter().filter(|v| !v.is_nan()).count()
    }
}

/// Output of [`SeriesRegularizer::regularize`]
#[derive(Debug, Clone)]
pub struct RegularizedSeries {
    pub record: SeriesRecord,
    /// Timestamps exactly as supplied, in input order
    pub original_timestamps: Vec<TimePoint>,
}

/// Regularizes series onto the grid of a fixed frequency pair
#[derive(Debug, Clone, Copy)]
pub struct SeriesRegularizer {
    frequency: FrequencyPair,
    sparse_fallback: bool,
}

impl SeriesRegularizer {
    pub fn new(frequency: FrequencyPair) -> Self {
        Self {
            frequency,
            sparse_fallback: false,
        }
    }

    /// Keep the sorted, deduplicated rows instead of failing when their span
    /// would need more than [`MAX_GRID_LEN`] grid points
    pub fn with_sparse_fallback(mut self) -> Self {
        self.sparse_fallback = true;
        self
    }

    pub fn frequency(&self) -> FrequencyPair {
        self.frequency
    }

    pub fn regularize(&self, raw: &RawSeries) -> Result<RegularizedSeries> {
        raw.validate()?;

        let mut order: Vec<usize> = (0..raw.len()).collect();
        order.sort_by_key(|&row| raw.timestamps[row]);
        order.dedup_by_key(|row| raw.timestamps[*row]);

        let record = match (order.first(), order.last()) {
            (Some(&first), Some(&last))
                if order.len() > 1 && self.fits_grid(raw.timestamps[first], raw.timestamps[last]) =>
            {
                let grid = self
                    .frequency
                    .reindex
                    .grid(raw.timestamps[first], raw.timestamps[last])?;
                let positions = self.align(raw, &order, &grid);
                let mut record = gather(raw, grid, &positions);
                for column in record.real.axis_iter_mut(Axis(1)) {
                    interpolate_linear(column);
                }
                for column in record.categorical.iter_mut() {
                    forward_fill(column);
                }
                record
            }
            _ => {
                let positions: Vec<Option<usize>> = order.iter().map(|&row| Some(row)).collect();
                let timestamps = order.iter().map(|&row| raw.timestamps[row]).collect();
                gather(raw, timestamps, &positions)
            }
        };

        Ok(RegularizedSeries {
            record,
            original_timestamps: raw.timestamps.clone(),
        })
    }

    fn fits_grid(&self, first: TimePoint, last: TimePoint) -> bool {
        if !self.sparse_fallback {
            return true;
        }
        let span = self.frequency.reindex.periods_between(first, last);
        let fits = span >= 0 && (span as u64) < MAX_GRID_LEN as u64;
        if !fits {
            debug!(
                span,
                frequency = %self.frequency.reindex,
                "Span too long for a grid; keeping the sorted rows"
            );
        }
        fits
    }

    /// Map each grid point to the source row observed at exactly that time.
    /// Rows that do not land on the grid are dropped.
    fn align(&self, raw: &RawSeries, order: &[usize], grid: &[TimePoint]) -> Vec<Option<usize>> {
        let mut positions = vec![None; grid.len()];
        let mut cursor = 0;
        let mut dropped = 0usize;

        for &row in order {
            let t = raw.timestamps[row];
            while cursor < grid.len() && grid[cursor] < t {
                cursor += 1;
            }
            if cursor < grid.len() && grid[cursor] == t {
                positions[cursor] = Some(row);
                cursor += 1;
            } else {
                dropped += 1;
            }
        }

        if dropped > 0 {
            debug!(
                dropped,
                frequency = %self.frequency.reindex,
                "Dropped rows that fall off the reindex grid"
            );
        }
        positions
    }
}

fn gather(raw: &RawSeries, timestamps: Vec<TimePoint>, positions: &[Option<usize>]) -> SeriesRecord {
    let target = positions
        .iter()
        .map(|p| p.map_or(f64::NAN, |row| raw.target[row]))
        .collect::<Array1<f64>>();

    let real = Array2::from_shape_fn((positions.len(), raw.real.ncols()), |(i, j)| {
        positions[i].map_or(f64::NAN, |row| raw.real[[row, j]])
    });

    let categorical = raw
        .categorical
        .iter()
        .map(|column| {
            positions
                .iter()
                .map(|p| p.and_then(|row| column[row].clone()))
                .collect()
        })
        .collect();

    SeriesRecord {
        timestamps,
        target,
        real,
        categorical,
    }
}

/// Fill NaN runs that lie between two observed values by linear
/// interpolation over positions. Leading and trailing NaNs are left alone.
pub fn interpolate_linear(mut values: ArrayViewMut1<'_, f64>) {
    let mut previous: Option<usize> = None;

    for i in 0..values.len() {
        if values[i].is_nan() {
            continue;
        }
        if let Some(p) = previous {
            if i > p + 1 {
                let (a, b) = (values[p], values[i]);
                let span = (i - p) as f64;
                for k in (p + 1)..i {
                    values[k] = a + (b - a) * ((k - p) as f64 / span);
                }
            }
        }
        previous = Some(i);
    }
}

/// Propagate the last known value forward over missing entries
pub fn forward_fill(values: &mut [Option<String>]) {
    let mut last: Option<String> = None;
    for value in values.iter_mut() {
        match value {
            Some(v) => last = Some(v.clone()),
            None => *value = last.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeseries::frequency::Frequency;
    use chrono::{NaiveDate, TimeDelta};
    use ndarray::array;

    fn hour(h: i64) -> TimePoint {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + TimeDelta::hours(h)
    }

    fn hourly() -> SeriesRegularizer {
        SeriesRegularizer::new(FrequencyPair::uniform(Frequency::hourly()))
    }

    fn raw(hours: &[i64], target: &[f64], real: &[f64], cat: &[Option<&str>]) -> RawSeries {
        RawSeries {
            timestamps: hours.iter().map(|&h| hour(h)).collect(),
            target: target.to_vec(),
            real: Array2::from_shape_vec((real.len(), 1), real.to_vec()).unwrap(),
            categorical: vec![cat.iter().map(|c| c.map(str::to_string)).collect()],
        }
    }

    #[test]
    fn test_sorts_dedups_and_reindexes() {
        let series = raw(
            &[3, 0, 1, 1],
            &[4.0, 1.0, 2.0, 99.0],
            &[40.0, 10.0, 20.0, 990.0],
            &[Some("d"), Some("a"), Some("b"), Some("z")],
        );
        let out = hourly().regularize(&series).unwrap();
        let record = out.record;

        assert_eq!(record.timestamps, vec![hour(0), hour(1), hour(2), hour(3)]);
        assert_eq!(record.target[1], 2.0);
        assert!(record.target[2].is_nan());
        assert_eq!(record.real[[1, 0]], 20.0);
        assert!((record.real[[2, 0]] - 30.0).abs() < 1e-9);
        assert_eq!(record.categorical[0][2].as_deref(), Some("b"));

        // original order preserved
        assert_eq!(out.original_timestamps, vec![hour(3), hour(0), hour(1), hour(1)]);
    }

    #[test]
    fn test_single_row_skips_reindex() {
        let series = raw(&[5], &[1.0], &[f64::NAN], &[None]);
        let out = hourly().regularize(&series).unwrap();
        assert_eq!(out.record.len(), 1);
        assert_eq!(out.record.start(), Some(hour(5)));
        assert!(out.record.real[[0, 0]].is_nan());
    }

    #[test]
    fn test_off_grid_rows_are_dropped() {
        let mut series = raw(&[0, 2], &[1.0, 3.0], &[1.0, 3.0], &[None, None]);
        series.timestamps.push(hour(1) + TimeDelta::minutes(30));
        series.target.push(7.0);
        series.real = array![[1.0], [3.0], [7.0]];
        series.categorical[0].push(None);

        let record = hourly().regularize(&series).unwrap().record;
        assert_eq!(record.len(), 3);
        assert!(record.target[1].is_nan());
        assert!((record.real[[1, 0]] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_interpolation_does_not_extrapolate() {
        let mut values = array![f64::NAN, 1.0, f64::NAN, f64::NAN, 4.0, f64::NAN];
        interpolate_linear(values.view_mut());
        assert!(values[0].is_nan());
        assert_eq!(values[1], 1.0);
        assert!((values[2] - 2.0).abs() < 1e-9);
        assert!((values[3] - 3.0).abs() < 1e-9);
        assert_eq!(values[4], 4.0);
        assert!(values[5].is_nan());
    }

    #[test]
    fn test_forward_fill_keeps_leading_gaps() {
        let mut values = vec![None, Some("a".to_string()), None, Some("b".to_string()), None];
        forward_fill(&mut values);
        assert_eq!(values[0], None);
        assert_eq!(values[2].as_deref(), Some("a"));
        assert_eq!(values[4].as_deref(), Some("b"));
    }

    #[test]
    fn test_long_span_keeps_sorted_rows_with_fallback() {
        let far = MAX_GRID_LEN as i64 + 100;
        let series = raw(&[far, 2, 2], &[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], &[None, None, None]);

        assert!(matches!(
            hourly().regularize(&series),
            Err(ForecastError::DataError(_))
        ));

        let out = hourly().with_sparse_fallback().regularize(&series).unwrap();
        assert_eq!(out.record.timestamps, vec![hour(2), hour(far)]);
        assert_eq!(out.record.target.to_vec(), vec![2.0, 1.0]);
        assert_eq!(out.original_timestamps, vec![hour(far), hour(2), hour(2)]);

        // short spans are still reindexed
        let short = raw(&[0, 2], &[1.0, 3.0], &[1.0, 3.0], &[None, None]);
        let record = hourly().with_sparse_fallback().regularize(&short).unwrap().record;
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let mut series = raw(&[0, 1], &[1.0, 2.0], &[1.0, 2.0], &[None, None]);
        series.target.pop();
        assert!(matches!(
            hourly().regularize(&series),
            Err(ForecastError::ShapeError { .. })
        ));
    }
}
