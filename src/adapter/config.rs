//! Adapter configuration

use crate::dataset::{DatasetSummary, TargetKind};
use crate::error::{ForecastError, Result};
use crate::forecast::{Distribution, ModelSettings, PaddingPolicy, Statistic};
use crate::timeseries::FrequencyPair;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::ops::RangeInclusive;

/// Training settings passed through to the external model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Number of training epochs
    pub epochs: usize,

    /// Batches drawn per epoch
    pub steps_per_epoch: usize,

    /// Optimizer learning rate
    pub learning_rate: f64,

    /// Series windows per training batch
    pub training_batch_size: usize,

    /// Number of recurrent layers
    pub num_layers: usize,

    /// Units per recurrent layer
    pub cell_dim: usize,

    /// Dropout applied between recurrent layers
    pub dropout_rate: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            epochs: 50,
            steps_per_epoch: 100,
            learning_rate: 1e-4,
            training_batch_size: 32,
            num_layers: 2,
            cell_dim: 40,
            dropout_rate: 0.1,
        }
    }
}

impl TrainerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the number of epochs
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Builder method to set the learning rate
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Builder method to set the network shape
    pub fn with_network(mut self, num_layers: usize, cell_dim: usize) -> Self {
        self.num_layers = num_layers;
        self.cell_dim = cell_dim;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_range("epochs", self.epochs, 1..=usize::MAX)?;
        check_range("steps_per_epoch", self.steps_per_epoch, 1..=200)?;
        check_range("learning_rate", self.learning_rate, 0.0..=1.0)?;
        check_range("training_batch_size", self.training_batch_size, 1..=256)?;
        check_range("num_layers", self.num_layers, 1..=16)?;
        check_range("cell_dim", self.cell_dim, 10..=400)?;
        check_range("dropout_rate", self.dropout_rate, 0.0..=1.0)?;
        Ok(())
    }
}

/// Configuration of a [`ForecastAdapter`](super::ForecastAdapter).
///
/// Fixed for the lifetime of a fitted instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Number of steps the model forecasts past the end of a series
    pub prediction_length: usize,

    /// Number of past steps the model conditions on
    pub context_length: usize,

    /// Treat the target as count data; `None` decides from its semantic type
    pub count_data: Option<bool>,

    /// Point estimate is the mean when true, the median otherwise
    pub output_mean: bool,

    /// Quantiles reported next to the point estimate
    pub quantiles: Vec<f64>,

    /// Sample paths used to approximate the output distribution
    pub number_samples: usize,

    /// Output for query rows outside the forecast horizon
    pub padding: PaddingPolicy,

    /// Query groups per model call
    pub inference_batch_size: usize,

    pub trainer: TrainerConfig,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            prediction_length: 30,
            context_length: 30,
            count_data: None,
            output_mean: true,
            quantiles: Vec::new(),
            number_samples: 100,
            padding: PaddingPolicy::Missing,
            inference_batch_size: 256,
            trainer: TrainerConfig::default(),
        }
    }
}

impl AdapterConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set prediction and context lengths
    pub fn with_horizon(mut self, prediction_length: usize, context_length: usize) -> Self {
        self.prediction_length = prediction_length;
        self.context_length = context_length;
        self
    }

    /// Builder method to force count or real-valued targets
    pub fn with_count_data(mut self, count_data: bool) -> Self {
        self.count_data = Some(count_data);
        self
    }

    /// Builder method to choose the point estimate
    pub fn with_output_mean(mut self, output_mean: bool) -> Self {
        self.output_mean = output_mean;
        self
    }

    /// Builder method to set the reported quantiles
    pub fn with_quantiles(mut self, quantiles: Vec<f64>) -> Self {
        self.quantiles = quantiles;
        self
    }

    pub fn with_number_samples(mut self, number_samples: usize) -> Self {
        self.number_samples = number_samples;
        self
    }

    /// Builder method to set the out-of-horizon padding policy
    pub fn with_padding(mut self, padding: PaddingPolicy) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_inference_batch_size(mut self, batch_size: usize) -> Self {
        self.inference_batch_size = batch_size;
        self
    }

    pub fn with_trainer(mut self, trainer: TrainerConfig) -> Self {
        self.trainer = trainer;
        self
    }

    /// Check every field against its supported range
    pub fn validate(&self) -> Result<()> {
        check_range("prediction_length", self.prediction_length, 1..=1000)?;
        check_range("context_length", self.context_length, 1..=1000)?;
        check_range("number_samples", self.number_samples, 1..=1000)?;
        check_range("inference_batch_size", self.inference_batch_size, 1..=1024)?;

        if let Some(&q) = self.quantiles.iter().find(|q| !(**q > 0.0 && **q < 1.0)) {
            return Err(ForecastError::InvalidParameter {
                name: "quantiles".to_string(),
                value: q.to_string(),
                reason: "quantiles must lie strictly between 0 and 1".to_string(),
            });
        }

        let names: Vec<String> = self.statistics().iter().map(Statistic::column_name).collect();
        if let Some(duplicate) = names
            .iter()
            .enumerate()
            .find_map(|(i, name)| names[..i].contains(name).then_some(name))
        {
            return Err(ForecastError::InvalidParameter {
                name: "quantiles".to_string(),
                value: duplicate.clone(),
                reason: "each reported statistic must be distinct".to_string(),
            });
        }

        self.trainer.validate()
    }

    /// Statistics reported by the confidence-interval output
    pub fn statistics(&self) -> Vec<Statistic> {
        Statistic::requested(self.output_mean, &self.quantiles)
    }

    /// Model settings for a dataset built under this configuration
    pub fn model_settings(&self, frequency: &FrequencyPair, summary: &DatasetSummary) -> ModelSettings {
        ModelSettings {
            frequency: frequency.canonical.alias(),
            prediction_length: self.prediction_length,
            context_length: self.context_length,
            use_static_categorical: summary.has_categorical || summary.has_group,
            use_dynamic_real: summary.has_real,
            cardinality: summary.cardinality.clone(),
            distribution: match summary.target_kind {
                TargetKind::Count => Distribution::NegativeBinomial,
                TargetKind::Real => Distribution::StudentT,
            },
            num_samples: self.number_samples,
            statistics: self.statistics(),
            trainer: self.trainer.clone(),
        }
    }
}

fn check_range<T>(name: &str, value: T, range: RangeInclusive<T>) -> Result<()>
where
    T: PartialOrd + Display,
{
    if range.contains(&value) {
        return Ok(());
    }
    Err(ForecastError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: format!("must be between {} and {}", range.start(), range.end()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeseries::Frequency;

    #[test]
    fn test_default_config() {
        let config = AdapterConfig::default();
        assert_eq!(config.prediction_length, 30);
        assert_eq!(config.context_length, 30);
        assert!(config.output_mean);
        assert_eq!(config.number_samples, 100);
        assert_eq!(config.padding, PaddingPolicy::Missing);
        assert_eq!(config.trainer.cell_dim, 40);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = AdapterConfig::new()
            .with_horizon(6, 12)
            .with_output_mean(false)
            .with_quantiles(vec![0.1, 0.9])
            .with_padding(PaddingPolicy::RepeatLast)
            .with_trainer(TrainerConfig::new().with_epochs(3));

        assert_eq!(config.prediction_length, 6);
        assert_eq!(config.context_length, 12);
        assert_eq!(config.trainer.epochs, 3);
        assert_eq!(
            config.statistics(),
            vec![
                Statistic::Median,
                Statistic::Quantile(0.1),
                Statistic::Quantile(0.9)
            ]
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = AdapterConfig::new().with_quantiles(vec![0.5, 1.0]);
        assert!(matches!(
            config.validate(),
            Err(ForecastError::InvalidParameter { name, .. }) if name == "quantiles"
        ));

        let config = AdapterConfig::new().with_trainer(TrainerConfig::new().with_network(2, 5));
        assert!(matches!(
            config.validate(),
            Err(ForecastError::InvalidParameter { name, .. }) if name == "cell_dim"
        ));

        let config = AdapterConfig::new().with_horizon(0, 30);
        assert!(config.validate().is_err());

        let config = AdapterConfig::new()
            .with_output_mean(false)
            .with_quantiles(vec![0.5]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_model_settings_from_summary() {
        let summary = DatasetSummary {
            has_categorical: false,
            has_group: true,
            has_real: false,
            cardinality: vec![4],
            max_series_length: 40,
            target_kind: TargetKind::Count,
        };
        let settings = AdapterConfig::new()
            .model_settings(&FrequencyPair::uniform(Frequency::daily()), &summary);

        assert_eq!(settings.frequency, "D");
        assert!(settings.use_static_categorical);
        assert!(!settings.use_dynamic_real);
        assert_eq!(settings.distribution, Distribution::NegativeBinomial);
        assert_eq!(settings.statistics, vec![Statistic::Mean]);
    }

    #[test]
    fn test_config_serde() {
        let config = AdapterConfig::new().with_count_data(true);
        let json = serde_json::to_string(&config).unwrap();
        let restored: AdapterConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);
    }
}
