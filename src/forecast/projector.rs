//! Projection of forecast arrays onto query rows

use super::array::ForecastArray;
use crate::dataset::GroupKey;
use crate::error::{ForecastError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// What to emit for offsets outside a forecast's horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaddingPolicy {
    /// Emit a missing value
    #[default]
    Missing,
    /// Repeat the last valid value of the group's forecast array. For a
    /// group unseen during fit that array is whatever the model returned
    /// for a request without history.
    RepeatLast,
}

/// A group's forecast together with the query rows it answers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupForecast {
    pub key: GroupKey,
    /// Query row index of each offset
    pub rows: Vec<usize>,
    pub offsets: Vec<i64>,
    pub forecast: ForecastArray,
}

/// Selects forecast values per row and reassembles them in query order
#[derive(Debug, Clone, Copy, Default)]
pub struct ForecastProjector {
    padding: PaddingPolicy,
}

impl ForecastProjector {
    pub fn new(padding: PaddingPolicy) -> Self {
        Self { padding }
    }

    pub fn padding(&self) -> PaddingPolicy {
        self.padding
    }

    /// `[offsets × statistics]` values for one group
    pub fn project_group(&self, offsets: &[i64], forecast: &ForecastArray) -> Array2<f64> {
        let statistics = forecast.statistics().len();
        let padding: Vec<f64> = (0..statistics)
            .map(|s| match self.padding {
                PaddingPolicy::Missing => f64::NAN,
                PaddingPolicy::RepeatLast => forecast.last_valid(s),
            })
            .collect();

        Array2::from_shape_fn((offsets.len(), statistics), |(i, s)| {
            forecast.at_offset(s, offsets[i]).unwrap_or(padding[s])
        })
    }

    /// Scatter every group's projection back to its query rows.
    ///
    /// The result has one row per query row, in query order, and one column
    /// per statistic. Every row in `0..rows` must be answered exactly once.
    pub fn project(
        &self,
        groups: &[GroupForecast],
        rows: usize,
        statistics: usize,
    ) -> Result<Array2<f64>> {
        let mut output = Array2::from_elem((rows, statistics), f64::NAN);
        let mut answered = vec![false; rows];

        for group in groups {
            if group.forecast.statistics().len() != statistics {
                return Err(ForecastError::ShapeError {
                    expected: format!("{} statistics", statistics),
                    actual: format!(
                        "{} statistics for group {}",
                        group.forecast.statistics().len(),
                        group.key
                    ),
                });
            }
            if group.rows.len() != group.offsets.len() {
                return Err(ForecastError::ShapeError {
                    expected: format!("{} offsets", group.rows.len()),
                    actual: group.offsets.len().to_string(),
                });
            }

            let projected = self.project_group(&group.offsets, &group.forecast);
            for (values, &row) in projected.outer_iter().zip(&group.rows) {
                match answered.get_mut(row) {
                    Some(seen) if !*seen => *seen = true,
                    _ => {
                        return Err(ForecastError::DataError(format!(
                            "query row {} is out of range or answered twice",
                            row
                        )))
                    }
                }
                output.row_mut(row).assign(&values);
            }
        }

        if let Some(row) = answered.iter().position(|seen| !seen) {
            return Err(ForecastError::DataError(format!(
                "query row {} has no forecast",
                row
            )));
        }
        Ok(output)
    }
}
