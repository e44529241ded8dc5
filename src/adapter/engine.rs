//! Fit/produce state machine around an external forecasting model

use super::cache::{fingerprint, CachedForecast, ProduceCache};
use super::config::AdapterConfig;
use super::state::FittedState;
use crate::dataset::{
    infer_table_frequency, AnnotatedFrame, ColumnRoles, GroupedDatasetBuilder, SeriesTable,
    TargetKind,
};
use crate::error::{ForecastError, Result};
use crate::forecast::{ForecastModel, ForecastProjector, ForecastRequest, GroupForecast};
use crate::timeseries::{FrequencyPair, IntervalMapper, UNSEEN_GROUP_OFFSET};
use ndarray::{Array2, ArrayView1};
use polars::prelude::*;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Fits a global forecasting model on grouped, irregular series and answers
/// forecasts at the caller's own query timestamps.
///
/// Starts unfitted; [`fit`](Self::fit) moves it to fitted, and produce calls
/// are only valid afterwards.
#[derive(Debug)]
pub struct ForecastAdapter<M: ForecastModel> {
    config: AdapterConfig,
    model: M,
    state: Option<FittedState>,
    /// Inferred on the first fit and kept for the life of the instance
    frequency: Option<FrequencyPair>,
    cache: ProduceCache,
}

impl<M: ForecastModel> ForecastAdapter<M> {
    pub fn new(config: AdapterConfig, model: M) -> Self {
        Self {
            config,
            model,
            state: None,
            frequency: None,
            cache: ProduceCache::new(),
        }
    }

    /// Restore a fitted instance without re-running fit. The model must
    /// already hold the weights trained alongside `state`.
    pub fn from_state(config: AdapterConfig, model: M, state: FittedState) -> Self {
        let mut adapter = Self::new(config, model);
        adapter.restore(state);
        adapter
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn is_fitted(&self) -> bool {
        self.state.as_ref().map_or(false, |s| s.fitted)
    }

    pub fn fitted_state(&self) -> Option<&FittedState> {
        self.state.as_ref()
    }

    /// Frequency pair in use, once inferred
    pub fn frequency(&self) -> Option<FrequencyPair> {
        self.frequency
    }

    /// Save the fitted state to a JSON file
    pub fn save_state(&self, path: impl AsRef<Path>) -> Result<()> {
        self.state
            .as_ref()
            .ok_or(ForecastError::ModelNotFitted)?
            .save(path)
    }

    /// Replace the fitted state with one loaded from a JSON file
    pub fn load_state(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let state = FittedState::load(path)?;
        self.restore(state);
        Ok(())
    }

    fn restore(&mut self, state: FittedState) {
        self.frequency = Some(state.frequency);
        self.state = Some(state);
        self.cache.clear();
    }

    /// Fit on `inputs` joined with `outputs`; the first column of `outputs`
    /// names the produced column.
    ///
    /// A failed fit leaves any previous fitted state untouched.
    pub fn fit(&mut self, inputs: &AnnotatedFrame, outputs: &AnnotatedFrame) -> Result<&mut Self> {
        let start = Instant::now();
        self.config.validate()?;
        self.cache.clear();

        let output_column = outputs.column_names().into_iter().next().ok_or_else(|| {
            ForecastError::ConfigError("outputs must contain at least one column".to_string())
        })?;

        let frame = inputs.append_columns(outputs)?;
        let roles = ColumnRoles::resolve(&frame)?;
        let table = SeriesTable::from_frame(&frame, &roles)?;

        let frequency = match self.frequency {
            Some(frequency) => frequency,
            None => infer_table_frequency(&table, roles.timestamp_encoding)?,
        };
        self.frequency = Some(frequency);

        let target_kind = TargetKind::resolve(self.config.count_data, &roles.target_semantic_types);
        let dataset = GroupedDatasetBuilder::new(frequency).build(
            &table,
            target_kind,
            self.config.prediction_length,
        )?;
        let settings = self.config.model_settings(&frequency, &dataset.summary);

        info!(
            rows = table.len(),
            groups = dataset.series.len(),
            frequency = %frequency.canonical,
            target_kind = ?target_kind,
            "Training forecasting model"
        );
        let train_start = Instant::now();
        self.model.train(&dataset, &settings)?;
        info!(
            elapsed_ms = train_start.elapsed().as_millis() as u64,
            "Model training finished"
        );

        self.state = Some(FittedState {
            roles,
            output_column,
            frequency,
            dataset,
            settings,
            fitted: true,
        });

        debug!(elapsed_ms = start.elapsed().as_millis() as u64, "Fit complete");
        Ok(self)
    }

    /// Point forecasts, one row per query row, in a column named after the
    /// output column
    pub fn produce(&mut self, inputs: &AnnotatedFrame) -> Result<DataFrame> {
        let values = self.forecast(inputs)?;
        let name = self.output_names()?.0;
        let column = values_column(&name, values.column(0));
        Ok(DataFrame::new(vec![column])?)
    }

    /// Point estimate and every configured quantile, one column each
    pub fn produce_confidence_intervals(&mut self, inputs: &AnnotatedFrame) -> Result<DataFrame> {
        let values = self.forecast(inputs)?;
        let names = self.output_names()?.1;
        let columns = names
            .iter()
            .zip(values.columns())
            .map(|(name, column)| values_column(name, column))
            .collect();
        Ok(DataFrame::new(columns)?)
    }

    /// Raw `[query rows × statistics]` projection; NaN marks missing values.
    ///
    /// The forecasts of the last call are reused when the same query is
    /// passed again.
    pub fn forecast(&mut self, inputs: &AnnotatedFrame) -> Result<Array2<f64>> {
        let state = self
            .state
            .as_ref()
            .filter(|s| s.fitted)
            .ok_or(ForecastError::ModelNotFitted)?;

        let table = SeriesTable::from_frame(inputs, &state.roles)?;
        let statistics = state.settings.statistics.len();
        let projector = ForecastProjector::new(self.config.padding);
        let key = fingerprint(&table);

        if let Some(cached) = self.cache.get(key, table.len()) {
            debug!(rows = cached.rows, "Reusing forecasts of the previous query");
            return projector.project(&cached.groups, cached.rows, statistics);
        }

        let groups = forecast_groups(
            &self.model,
            state,
            &table,
            self.config.inference_batch_size,
        )?;
        let output = projector.project(&groups, table.len(), statistics)?;

        self.cache.store(CachedForecast {
            fingerprint: key,
            rows: table.len(),
            groups,
        });
        Ok(output)
    }

    fn output_names(&self) -> Result<(String, Vec<String>)> {
        let state = self.state.as_ref().ok_or(ForecastError::ModelNotFitted)?;
        let statistics = state
            .settings
            .statistics
            .iter()
            .map(|s| s.column_name())
            .collect();
        Ok((state.output_column.clone(), statistics))
    }
}

/// Regularize the query groups, map their timestamps to offsets and ask the
/// model for one forecast array per group
fn forecast_groups<M: ForecastModel>(
    model: &M,
    state: &FittedState,
    table: &SeriesTable,
    batch_size: usize,
) -> Result<Vec<GroupForecast>> {
    let groups = GroupedDatasetBuilder::for_queries(state.frequency).regularize_groups(table)?;
    let mapper = IntervalMapper::new(state.frequency.canonical);

    let offsets: Vec<Vec<i64>> = groups
        .iter()
        .map(|group| {
            let train_start = state.dataset.train_starts.get(&group.key);
            if train_start.is_none() {
                warn!(
                    group = %group.key,
                    rows = group.rows.len(),
                    "Query group was not seen during fit; its rows follow the padding policy"
                );
            }
            mapper.offsets(&group.original_timestamps, train_start)
        })
        .collect();

    let arrays = {
        let requests: Vec<ForecastRequest<'_>> = groups
            .iter()
            .zip(&offsets)
            .map(|(group, offsets)| ForecastRequest {
                key: &group.key,
                history: state.dataset.series_for(&group.key).map(|s| &s.record),
                query: &group.record,
                offsets,
                static_cat: state.dataset.static_codes(&group.key, &group.record),
                max_offset: offsets
                    .iter()
                    .copied()
                    .max()
                    .unwrap_or(UNSEEN_GROUP_OFFSET)
                    .max(UNSEEN_GROUP_OFFSET),
            })
            .collect();

        let start = Instant::now();
        let mut arrays = Vec::with_capacity(requests.len());
        for batch in requests.chunks(batch_size.max(1)) {
            let predicted = model.predict(batch)?;
            if predicted.len() != batch.len() {
                return Err(ForecastError::ShapeError {
                    expected: format!("{} forecast arrays", batch.len()),
                    actual: predicted.len().to_string(),
                });
            }
            arrays.extend(predicted);
        }
        info!(
            groups = requests.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model inference finished"
        );
        arrays
    };

    for (array, group) in arrays.iter().zip(&groups) {
        if array.statistics() != state.settings.statistics.as_slice() {
            return Err(ForecastError::InferenceError(format!(
                "forecast for group {} has statistics {:?}, expected {:?}",
                group.key,
                array.statistics(),
                state.settings.statistics
            )));
        }
    }

    Ok(groups
        .into_iter()
        .zip(offsets)
        .zip(arrays)
        .map(|((group, offsets), forecast)| GroupForecast {
            key: group.key,
            rows: group.rows,
            offsets,
            forecast,
        })
        .collect())
}

fn values_column(name: &str, values: ArrayView1<'_, f64>) -> Column {
    let values: Vec<Option<f64>> = values
        .iter()
        .map(|&v| if v.is_nan() { None } else { Some(v) })
        .collect();
    Column::new(name.into(), values)
}
