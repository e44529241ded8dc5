//! Shared fixtures for integration tests

#![allow(dead_code)]

use kolosal_forecast::prelude::*;
use kolosal_forecast::dataset::TrainingDataset;
use ndarray::Array2;
use polars::prelude::*;
use std::cell::Cell;

/// 2020-01-01T00:00:00Z
pub const BASE_EPOCH: i64 = 1_577_836_800;
pub const HOUR: i64 = 3_600;

/// Offset added to out-of-sample steps of seen groups
pub const FORECAST_BASE: f64 = 1000.0;
/// Offset added to every step of unseen groups
pub const UNSEEN_BASE: f64 = 500.0;
/// Spacing between statistic rows
pub const STATISTIC_STRIDE: f64 = 100.0;

/// Deterministic stand-in for a probabilistic model.
///
/// For a seen group the array covers the training history followed by
/// `prediction_length` future steps: in-sample columns echo the training
/// target, future step `k` (1-based) of statistic `s` is
/// `FORECAST_BASE + k + STATISTIC_STRIDE * s`. Unseen groups get
/// `prediction_length` columns of `UNSEEN_BASE + k + STATISTIC_STRIDE * s`.
#[derive(Debug, Default)]
pub struct StubModel {
    pub settings: Option<ModelSettings>,
    pub train_calls: usize,
    pub predict_calls: Cell<usize>,
    pub fail_training: bool,
}

impl StubModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A model restored with the settings it was trained under
    pub fn with_settings(settings: ModelSettings) -> Self {
        Self {
            settings: Some(settings),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_training: true,
            ..Self::default()
        }
    }
}

impl ForecastModel for StubModel {
    fn train(&mut self, _dataset: &TrainingDataset, settings: &ModelSettings) -> Result<()> {
        if self.fail_training {
            return Err(ForecastError::TrainingError("optimizer diverged".to_string()));
        }
        self.train_calls += 1;
        self.settings = Some(settings.clone());
        Ok(())
    }

    fn predict(&self, requests: &[ForecastRequest<'_>]) -> Result<Vec<ForecastArray>> {
        let settings = self
            .settings
            .as_ref()
            .ok_or_else(|| ForecastError::InferenceError("model was never trained".to_string()))?;
        self.predict_calls.set(self.predict_calls.get() + 1);

        let statistics = settings.statistics.len();
        let horizon = settings.prediction_length;

        requests
            .iter()
            .map(|request| {
                let values = match request.history {
                    Some(history) => {
                        let observed = history.len();
                        Array2::from_shape_fn((statistics, observed + horizon), |(s, j)| {
                            if j < observed {
                                history.target[j]
                            } else {
                                FORECAST_BASE + (j - observed + 1) as f64 + STATISTIC_STRIDE * s as f64
                            }
                        })
                    }
                    None => Array2::from_shape_fn((statistics, horizon), |(s, j)| {
                        UNSEEN_BASE + (j + 1) as f64 + STATISTIC_STRIDE * s as f64
                    }),
                };
                ForecastArray::new(settings.statistics.clone(), values)
            })
            .collect()
    }
}

/// Hourly series of `hours` points with `gap` hours left out, epoch-second
/// timestamps, target `value` = 10 + hour and real feature `temp` = hour
pub fn hourly_frames(hours: i64, gap: &[i64]) -> (AnnotatedFrame, AnnotatedFrame) {
    let kept: Vec<i64> = (0..hours).filter(|h| !gap.contains(h)).collect();
    let time: Vec<i64> = kept.iter().map(|h| BASE_EPOCH + h * HOUR).collect();
    let temp: Vec<f64> = kept.iter().map(|&h| h as f64).collect();
    let value: Vec<f64> = kept.iter().map(|&h| 10.0 + h as f64).collect();

    let inputs = AnnotatedFrame::new(df!("time" => time, "temp" => temp).unwrap())
        .with_semantic_types("time", &[SemanticType::Time])
        .with_semantic_types("temp", &[SemanticType::Float]);
    let outputs = AnnotatedFrame::new(df!("value" => value).unwrap())
        .with_semantic_types("value", &[SemanticType::TrueTarget, SemanticType::Float]);
    (inputs, outputs)
}

/// Query rows for the given hours, without target
pub fn hourly_query(hours: &[i64]) -> AnnotatedFrame {
    let time: Vec<i64> = hours.iter().map(|h| BASE_EPOCH + h * HOUR).collect();
    let temp: Vec<f64> = hours.iter().map(|&h| h as f64).collect();
    AnnotatedFrame::new(df!("time" => time, "temp" => temp).unwrap())
}

/// Daily grouped series: `(store, days)` pairs, 1-based day counts starting
/// at day 100, integer `sales` target
pub fn daily_frames(groups: &[(&str, i64)]) -> (AnnotatedFrame, AnnotatedFrame) {
    let mut store = Vec::new();
    let mut day = Vec::new();
    let mut sales = Vec::new();
    for &(name, days) in groups {
        for d in 0..days {
            store.push(name);
            day.push(100 + d);
            sales.push(d * 2);
        }
    }

    let inputs = AnnotatedFrame::new(df!("store" => store, "day" => day).unwrap())
        .with_semantic_types("store", &[SemanticType::GroupingKey, SemanticType::CategoricalData])
        .with_semantic_types("day", &[SemanticType::Time, SemanticType::Integer]);
    let outputs = AnnotatedFrame::new(df!("sales" => sales).unwrap())
        .with_semantic_types("sales", &[SemanticType::Target, SemanticType::Integer]);
    (inputs, outputs)
}

/// Query rows for `(store, day)` pairs
pub fn daily_query(rows: &[(&str, i64)]) -> AnnotatedFrame {
    let store: Vec<&str> = rows.iter().map(|r| r.0).collect();
    let day: Vec<i64> = rows.iter().map(|r| r.1).collect();
    AnnotatedFrame::new(df!("store" => store, "day" => day).unwrap())
}

/// Values of a float column, `None` for nulls
pub fn column_values(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .into_iter()
        .collect()
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}
