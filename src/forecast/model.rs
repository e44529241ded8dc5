//! External forecasting model interface

use super::array::{ForecastArray, Statistic};
use crate::adapter::TrainerConfig;
use crate::dataset::{GroupKey, TrainingDataset};
use crate::error::Result;
use crate::timeseries::SeriesRecord;
use serde::{Deserialize, Serialize};

/// Output distribution family of the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distribution {
    /// Non-negative count targets
    NegativeBinomial,
    /// Real-valued targets
    StudentT,
}

/// Settings handed to the model alongside the training dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Canonical frequency alias, e.g. "H", "15T", "D"
    pub frequency: String,
    pub prediction_length: usize,
    pub context_length: usize,
    pub use_static_categorical: bool,
    pub use_dynamic_real: bool,
    /// Embedding sizes, one per static categorical feature
    pub cardinality: Vec<usize>,
    pub distribution: Distribution,
    /// Sample paths drawn to approximate the output distribution
    pub num_samples: usize,
    /// Rows every returned forecast array must carry, in order
    pub statistics: Vec<Statistic>,
    pub trainer: TrainerConfig,
}

/// Everything the model needs to forecast one query group
#[derive(Debug, Clone)]
pub struct ForecastRequest<'a> {
    pub key: &'a GroupKey,
    /// Training series of the group; `None` for groups unseen during fit
    pub history: Option<&'a SeriesRecord>,
    /// Regularized query rows of the group
    pub query: &'a SeriesRecord,
    /// Offset of each query row from the training start
    pub offsets: &'a [i64],
    pub static_cat: Vec<Option<usize>>,
    /// Largest offset requested; 0 when the group is unseen
    pub max_offset: i64,
}

/// A probabilistic forecasting model trained on regularized series.
///
/// `predict` returns one [`ForecastArray`] per request, in request order.
/// Column `j` of an array answers offset `j + 1` counted from the group's
/// training start, so the array width is the span the model covers.
pub trait ForecastModel {
    fn train(&mut self, dataset: &TrainingDataset, settings: &ModelSettings) -> Result<()>;

    fn predict(&self, requests: &[ForecastRequest<'_>]) -> Result<Vec<ForecastArray>>;
}
