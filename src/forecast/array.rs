//! Per-group forecast arrays

use crate::error::{ForecastError, Result};
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// An output statistic of the forecast distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Statistic {
    Mean,
    Median,
    Quantile(f64),
}

impl Statistic {
    /// Output column name: "mean", "0.5", or the quantile value
    pub fn column_name(&self) -> String {
        match self {
            Statistic::Mean => "mean".to_string(),
            Statistic::Median => "0.5".to_string(),
            Statistic::Quantile(q) => q.to_string(),
        }
    }

    /// Point estimate first, then the quantiles in the order given
    pub fn requested(output_mean: bool, quantiles: &[f64]) -> Vec<Statistic> {
        let point = if output_mean {
            Statistic::Mean
        } else {
            Statistic::Median
        };
        std::iter::once(point)
            .chain(quantiles.iter().map(|&q| Statistic::Quantile(q)))
            .collect()
    }
}

/// Forecast of one group: `[statistic × horizon step]`.
///
/// Column `j` answers offset `j + 1` from the group's training start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastArray {
    statistics: Vec<Statistic>,
    #[serde(with = "crate::timeseries::nan_serde::array2")]
    values: Array2<f64>,
}

impl ForecastArray {
    pub fn new(statistics: Vec<Statistic>, values: Array2<f64>) -> Result<Self> {
        if values.nrows() != statistics.len() {
            return Err(ForecastError::ShapeError {
                expected: format!("{} statistic rows", statistics.len()),
                actual: format!("{} rows", values.nrows()),
            });
        }
        Ok(Self { statistics, values })
    }

    pub fn statistics(&self) -> &[Statistic] {
        &self.statistics
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn row(&self, statistic: usize) -> ArrayView1<'_, f64> {
        self.values.row(statistic)
    }

    /// Number of forecast steps
    pub fn horizon(&self) -> usize {
        self.values.ncols()
    }

    /// Value at `offset`, or `None` when the offset lies outside `1..=horizon`
    pub fn at_offset(&self, statistic: usize, offset: i64) -> Option<f64> {
        let step = usize::try_from(offset).ok()?.checked_sub(1)?;
        self.values.get((statistic, step)).copied()
    }

    /// Last non-missing value of a statistic, NaN when there is none
    pub fn last_valid(&self, statistic: usize) -> f64 {
        self.values
            .row(statistic)
            .iter()
            .rev()
            .find(|v| !v.is_nan())
            .copied()
            .unwrap_or(f64::NAN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_column_names() {
        let stats = Statistic::requested(false, &[0.1, 0.9]);
        let names: Vec<String> = stats.iter().map(Statistic::column_name).collect();
        assert_eq!(names, vec!["0.5", "0.1", "0.9"]);
        assert_eq!(Statistic::Mean.column_name(), "mean");
    }

    #[test]
    fn test_offsets_outside_horizon() {
        let forecast = ForecastArray::new(vec![Statistic::Mean], array![[1.0, 2.0, 3.0]]).unwrap();
        assert_eq!(forecast.at_offset(0, 1), Some(1.0));
        assert_eq!(forecast.at_offset(0, 3), Some(3.0));
        assert_eq!(forecast.at_offset(0, 0), None);
        assert_eq!(forecast.at_offset(0, 4), None);
        assert_eq!(forecast.at_offset(0, -2), None);
    }

    #[test]
    fn test_last_valid_skips_trailing_gaps() {
        let forecast = ForecastArray::new(
            vec![Statistic::Mean, Statistic::Quantile(0.9)],
            array![[1.0, 2.0, f64::NAN], [f64::NAN, f64::NAN, f64::NAN]],
        )
        .unwrap();
        assert_eq!(forecast.last_valid(0), 2.0);
        assert!(forecast.last_valid(1).is_nan());
    }

    #[test]
    fn test_statistic_rows_must_match() {
        let result = ForecastArray::new(vec![Statistic::Mean], array![[1.0], [2.0]]);
        assert!(matches!(result, Err(ForecastError::ShapeError { .. })));
    }
}
