//! Annotated input frames and their role-resolved row view

use super::group::{partition, GroupKey};
use super::schema::{ColumnRoles, SemanticType};
use crate::error::{ForecastError, Result};
use crate::timeseries::{RawSeries, TimePoint};
use indexmap::IndexMap;
use ndarray::Array2;
use polars::prelude::*;
use std::collections::HashMap;

/// A polars `DataFrame` whose columns carry semantic tags
#[derive(Debug, Clone)]
pub struct AnnotatedFrame {
    data: DataFrame,
    semantic_types: HashMap<String, Vec<SemanticType>>,
}

impl AnnotatedFrame {
    /// Wrap a frame with no tags
    pub fn new(data: DataFrame) -> Self {
        Self {
            data,
            semantic_types: HashMap::new(),
        }
    }

    /// Builder method to tag a column
    pub fn with_semantic_types(mut self, column: &str, types: &[SemanticType]) -> Self {
        for &semantic_type in types {
            self.add_semantic_type(column, semantic_type);
        }
        self
    }

    pub fn add_semantic_type(&mut self, column: &str, semantic_type: SemanticType) {
        let tags = self.semantic_types.entry(column.to_string()).or_default();
        if !tags.contains(&semantic_type) {
            tags.push(semantic_type);
        }
    }

    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    pub fn height(&self) -> usize {
        self.data.height()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.data
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.data.column(name).is_ok()
    }

    pub fn semantic_types(&self, column: &str) -> &[SemanticType] {
        self.semantic_types
            .get(column)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Columns carrying any of `types`, in frame order
    pub fn columns_with(&self, types: &[SemanticType]) -> Vec<String> {
        self.column_names()
            .into_iter()
            .filter(|name| self.semantic_types(name).iter().any(|t| types.contains(t)))
            .collect()
    }

    /// Join the columns of `other` to the right of this frame. Columns this
    /// frame already holds are not duplicated, only their tags are merged.
    pub fn append_columns(&self, other: &AnnotatedFrame) -> Result<AnnotatedFrame> {
        if other.height() != self.height() && other.data.width() > 0 {
            return Err(ForecastError::ShapeError {
                expected: format!("{} rows", self.height()),
                actual: format!("{} rows", other.height()),
            });
        }

        let new_columns: Vec<Column> = other
            .data
            .get_columns()
            .iter()
            .filter(|c| !self.has_column(c.name().as_str()))
            .cloned()
            .collect();

        let mut joined = AnnotatedFrame {
            data: self.data.hstack(&new_columns)?,
            semantic_types: self.semantic_types.clone(),
        };
        for (column, tags) in &other.semantic_types {
            for &tag in tags {
                joined.add_semantic_type(column, tag);
            }
        }
        Ok(joined)
    }
}

/// Role-resolved rows of an input table. Missing numeric values are NaN.
#[derive(Debug, Clone)]
pub struct SeriesTable {
    pub timestamps: Vec<TimePoint>,
    pub target: Vec<f64>,
    /// rows × real-valued feature columns
    pub real: Array2<f64>,
    /// One vector per categorical column
    pub categorical: Vec<Vec<Option<String>>>,
    pub keys: Vec<GroupKey>,
}

impl SeriesTable {
    /// Extract the resolved columns of `frame`. The target may be absent
    /// (query tables), in which case it is all-missing.
    pub fn from_frame(frame: &AnnotatedFrame, roles: &ColumnRoles) -> Result<Self> {
        let height = frame.height();

        let raw_timestamps = real_values(column_series(frame, &roles.timestamp)?)?;
        let timestamps = raw_timestamps
            .iter()
            .enumerate()
            .map(|(row, &raw)| {
                if raw.is_nan() {
                    return Err(ForecastError::DataError(format!(
                        "timestamp column '{}' is missing a value at row {}",
                        roles.timestamp, row
                    )));
                }
                roles.timestamp_encoding.decode(raw)
            })
            .collect::<Result<Vec<_>>>()?;

        let target = if frame.has_column(&roles.target) {
            real_values(column_series(frame, &roles.target)?)?
        } else {
            vec![f64::NAN; height]
        };

        let real_columns = roles
            .real
            .iter()
            .map(|name| real_values(column_series(frame, name)?))
            .collect::<Result<Vec<_>>>()?;
        let real = Array2::from_shape_fn((height, real_columns.len()), |(i, j)| real_columns[j][i]);

        let categorical = roles
            .categorical
            .iter()
            .map(|name| text_values(column_series(frame, name)?))
            .collect::<Result<Vec<_>>>()?;

        let grouping = roles
            .grouping
            .iter()
            .map(|name| text_values(column_series(frame, name)?))
            .collect::<Result<Vec<_>>>()?;
        let keys = (0..height)
            .map(|row| GroupKey::new(grouping.iter().map(|column| column[row].clone()).collect()))
            .collect();

        Ok(Self {
            timestamps,
            target,
            real,
            categorical,
            keys,
        })
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Row indices per group, in first-encountered order
    pub fn partition(&self) -> IndexMap<GroupKey, Vec<usize>> {
        partition(&self.keys)
    }

    /// Gather the given rows, in the given order
    pub fn rows(&self, rows: &[usize]) -> RawSeries {
        RawSeries {
            timestamps: rows.iter().map(|&r| self.timestamps[r]).collect(),
            target: rows.iter().map(|&r| self.target[r]).collect(),
            real: self.real.select(ndarray::Axis(0), rows),
            categorical: self
                .categorical
                .iter()
                .map(|column| rows.iter().map(|&r| column[r].clone()).collect())
                .collect(),
        }
    }
}

fn column_series<'a>(frame: &'a AnnotatedFrame, name: &str) -> Result<&'a Series> {
    let column = frame
        .data()
        .column(name)
        .map_err(|_| ForecastError::FeatureNotFound(name.to_string()))?;
    Ok(column.as_materialized_series())
}

fn real_values(series: &Series) -> Result<Vec<f64>> {
    let casted = series.cast(&DataType::Float64)?;
    let values = casted
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();
    Ok(values)
}

fn text_values(series: &Series) -> Result<Vec<Option<String>>> {
    let casted = series.cast(&DataType::String)?;
    let values = casted
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}
