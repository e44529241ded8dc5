//! Grouped dataset construction
//!
//! Partitions a role-resolved table by group key, regularizes every group and
//! gathers the cross-group statistics the external model is configured from.

use super::group::GroupKey;
use super::schema::{ColumnRoles, SemanticType};
use super::table::SeriesTable;
use crate::error::{ForecastError, Result};
use crate::timeseries::{
    infer_from_timestamps, to_epoch_seconds, Frequency, FrequencyPair, SeriesRecord,
    SeriesRegularizer, TimePoint, TimestampEncoding,
};
use indexmap::{IndexMap, IndexSet};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How the target is modelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    /// Non-negative counts
    Count,
    /// General real values
    Real,
}

impl TargetKind {
    /// Explicit configuration wins; otherwise an Integer-tagged target is
    /// treated as count data.
    pub fn resolve(count_data: Option<bool>, target_types: &[SemanticType]) -> Self {
        let is_count = count_data.unwrap_or_else(|| target_types.contains(&SemanticType::Integer));
        if is_count {
            TargetKind::Count
        } else {
            TargetKind::Real
        }
    }
}

/// Assigns integer codes to category values in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    values: IndexSet<String>,
}

impl CategoryEncoder {
    pub fn fit<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a Option<String>>,
    {
        let values = values.into_iter().flatten().cloned().collect();
        Self { values }
    }

    /// Code of `value`; `None` for nulls and values never seen while fitting
    pub fn encode(&self, value: Option<&str>) -> Option<usize> {
        value.and_then(|v| self.values.get_index_of(v))
    }

    pub fn cardinality(&self) -> usize {
        self.values.len()
    }
}

/// Cross-group statistics used to configure the external model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub has_categorical: bool,
    pub has_group: bool,
    pub has_real: bool,
    /// Distinct values per categorical column, then per grouping column
    pub cardinality: Vec<usize>,
    pub max_series_length: usize,
    pub target_kind: TargetKind,
}

/// First regularized timestamp of every training group, in partition order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<(GroupKey, TimePoint)>", into = "Vec<(GroupKey, TimePoint)>")]
pub struct TrainStarts(IndexMap<GroupKey, TimePoint>);

impl TrainStarts {
    pub fn get(&self, key: &GroupKey) -> Option<TimePoint> {
        self.0.get(key).copied()
    }

    pub fn contains(&self, key: &GroupKey) -> bool {
        self.0.contains_key(key)
    }

    pub fn position(&self, key: &GroupKey) -> Option<usize> {
        self.0.get_index_of(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, &TimePoint)> {
        self.0.iter()
    }
}

impl From<Vec<(GroupKey, TimePoint)>> for TrainStarts {
    fn from(entries: Vec<(GroupKey, TimePoint)>) -> Self {
        Self(entries.into_iter().collect())
    }
}

impl From<TrainStarts> for Vec<(GroupKey, TimePoint)> {
    fn from(starts: TrainStarts) -> Self {
        starts.0.into_iter().collect()
    }
}

/// One regularized group handed to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSeries {
    pub key: GroupKey,
    pub record: SeriesRecord,
    /// Static codes: categorical columns first, then grouping columns
    pub static_cat: Vec<Option<usize>>,
}

/// Regularized training data plus everything produce needs from fit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingDataset {
    pub series: Vec<TrainingSeries>,
    pub summary: DatasetSummary,
    pub train_starts: TrainStarts,
    /// Same order as `TrainingSeries::static_cat`
    pub encoders: Vec<CategoryEncoder>,
}

impl TrainingDataset {
    /// Training series of a group, if it was seen during fit
    pub fn series_for(&self, key: &GroupKey) -> Option<&TrainingSeries> {
        self.train_starts
            .position(key)
            .and_then(|index| self.series.get(index))
    }

    /// Static codes for a group's key and one of its records
    pub fn static_codes(&self, key: &GroupKey, record: &SeriesRecord) -> Vec<Option<usize>> {
        static_codes(&self.encoders, key, record)
    }

    /// Concatenated training matrix, group after group
    pub fn to_frame(&self, roles: &ColumnRoles) -> Result<DataFrame> {
        let rows: usize = self.series.iter().map(|s| s.record.len()).sum();

        let mut timestamps = Vec::with_capacity(rows);
        let mut target = Vec::with_capacity(rows);
        for series in &self.series {
            timestamps.extend(series.record.timestamps.iter().map(|&t| to_epoch_seconds(t)));
            target.extend(series.record.target.iter().map(|&v| finite(v)));
        }

        let mut columns = vec![Column::new(roles.timestamp.as_str().into(), timestamps)];

        for (i, name) in roles.grouping.iter().enumerate() {
            let values: Vec<Option<&str>> = self
                .series
                .iter()
                .flat_map(|s| {
                    let value = s.key.values().get(i).and_then(|v| v.as_deref());
                    std::iter::repeat(value).take(s.record.len())
                })
                .collect();
            columns.push(Column::new(name.as_str().into(), values));
        }

        columns.push(Column::new(roles.target.as_str().into(), target));

        for (j, name) in roles.real.iter().enumerate() {
            let values: Vec<Option<f64>> = self
                .series
                .iter()
                .flat_map(|s| s.record.real.column(j).iter().map(|&v| finite(v)).collect::<Vec<_>>())
                .collect();
            columns.push(Column::new(name.as_str().into(), values));
        }

        for (j, name) in roles.categorical.iter().enumerate() {
            let values: Vec<Option<&str>> = self
                .series
                .iter()
                .flat_map(|s| s.record.categorical[j].iter().map(|v| v.as_deref()))
                .collect();
            columns.push(Column::new(name.as_str().into(), values));
        }

        Ok(DataFrame::new(columns)?)
    }
}

/// A regularized group with the input rows it was built from
#[derive(Debug, Clone)]
pub struct RegularizedGroup {
    pub key: GroupKey,
    pub record: SeriesRecord,
    pub original_timestamps: Vec<TimePoint>,
    /// Input row index of each original timestamp
    pub rows: Vec<usize>,
}

/// Builds training datasets for a fixed frequency
#[derive(Debug, Clone, Copy)]
pub struct GroupedDatasetBuilder {
    regularizer: SeriesRegularizer,
}

impl GroupedDatasetBuilder {
    pub fn new(frequency: FrequencyPair) -> Self {
        Self {
            regularizer: SeriesRegularizer::new(frequency),
        }
    }

    /// Builder for query tables. Groups spanning more than a grid can hold
    /// keep their sorted rows instead of failing.
    pub fn for_queries(frequency: FrequencyPair) -> Self {
        Self {
            regularizer: SeriesRegularizer::new(frequency).with_sparse_fallback(),
        }
    }

    pub fn frequency(&self) -> FrequencyPair {
        self.regularizer.frequency()
    }

    /// Regularize every group of `table`, in first-encountered order
    pub fn regularize_groups(&self, table: &SeriesTable) -> Result<Vec<RegularizedGroup>> {
        table
            .partition()
            .into_iter()
            .map(|(key, rows)| {
                let regularized = self.regularizer.regularize(&table.rows(&rows))?;
                Ok(RegularizedGroup {
                    key,
                    record: regularized.record,
                    original_timestamps: regularized.original_timestamps,
                    rows,
                })
            })
            .collect()
    }

    /// Regularize the training table and summarize it.
    ///
    /// Fails when the longest regularized series is shorter than
    /// `prediction_length`.
    pub fn build(
        &self,
        table: &SeriesTable,
        target_kind: TargetKind,
        prediction_length: usize,
    ) -> Result<TrainingDataset> {
        if table.is_empty() {
            return Err(ForecastError::DataError(
                "training table has no rows".to_string(),
            ));
        }

        let groups = self.regularize_groups(table)?;
        let grouping_width = groups.first().map_or(0, |g| g.key.values().len());

        let mut encoders: Vec<CategoryEncoder> = (0..table.categorical.len())
            .map(|j| CategoryEncoder::fit(groups.iter().flat_map(|g| g.record.categorical[j].iter())))
            .collect();
        let group_values: Vec<Vec<Option<String>>> = (0..grouping_width)
            .map(|i| groups.iter().map(|g| g.key.values()[i].clone()).collect())
            .collect();
        encoders.extend(group_values.iter().map(CategoryEncoder::fit));

        let max_series_length = groups.iter().map(|g| g.record.len()).max().unwrap_or(0);
        check_window_support(max_series_length, prediction_length)?;

        let summary = DatasetSummary {
            has_categorical: !table.categorical.is_empty(),
            has_group: grouping_width > 0,
            has_real: table.real.ncols() > 0,
            cardinality: encoders.iter().map(CategoryEncoder::cardinality).collect(),
            max_series_length,
            target_kind,
        };

        let mut train_starts = IndexMap::with_capacity(groups.len());
        let series = groups
            .into_iter()
            .filter_map(|group| {
                let start = group.record.start()?;
                train_starts.insert(group.key.clone(), start);
                let static_cat = static_codes(&encoders, &group.key, &group.record);
                Some(TrainingSeries {
                    key: group.key,
                    record: group.record,
                    static_cat,
                })
            })
            .collect::<Vec<_>>();

        debug!(
            groups = series.len(),
            max_series_length,
            cardinality = ?summary.cardinality,
            "Built training dataset"
        );

        Ok(TrainingDataset {
            series,
            summary,
            train_starts: TrainStarts(train_starts),
            encoders,
        })
    }
}

/// Infer the frequency from the first group holding at least two distinct
/// timestamps. Other groups are assumed to share it.
///
/// Day-count timestamps are always daily, whatever their spacing.
pub fn infer_table_frequency(
    table: &SeriesTable,
    encoding: TimestampEncoding,
) -> Result<FrequencyPair> {
    if encoding == TimestampEncoding::DayCount {
        return Ok(FrequencyPair::uniform(Frequency::daily()));
    }

    let mut best = 0;
    for rows in table.partition().values() {
        let timestamps: Vec<TimePoint> = rows.iter().map(|&r| table.timestamps[r]).collect();
        match infer_from_timestamps(&timestamps) {
            Err(ForecastError::InsufficientData { got, .. }) => best = best.max(got),
            other => return other,
        }
    }
    Err(ForecastError::InsufficientData {
        needed: 2,
        got: best,
    })
}

/// At least one training series must cover a full prediction window
pub fn check_window_support(max_series_length: usize, prediction_length: usize) -> Result<()> {
    if max_series_length < prediction_length {
        return Err(ForecastError::HorizonNotSupported {
            prediction_length,
            max_series_length,
        });
    }
    Ok(())
}

fn static_codes(
    encoders: &[CategoryEncoder],
    key: &GroupKey,
    record: &SeriesRecord,
) -> Vec<Option<usize>> {
    let categorical = record
        .categorical
        .iter()
        .map(|column| column.iter().flatten().next().map(String::as_str));
    let grouping = key.values().iter().map(|v| v.as_deref());

    categorical
        .chain(grouping)
        .zip(encoders)
        .map(|(value, encoder)| encoder.encode(value))
        .collect()
}

fn finite(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}
