//! Kolosal Forecast - time-series alignment and forecast projection
//!
//! This crate wraps a global probabilistic forecasting model so it can be fit
//! on many grouped, irregularly sampled series and answer forecasts at the
//! caller's own query timestamps:
//! - Canonical frequency inference from observed timestamps
//! - Per-group regularization onto uniform grids
//! - Mapping query timestamps onto forecast offsets
//! - Projection of per-group forecast arrays back onto query rows
//!
//! # Modules
//!
//! - [`timeseries`] - Timestamps, frequencies, regularization, offsets
//! - [`dataset`] - Annotated frames, column roles, grouped training data
//! - [`forecast`] - External model seam and forecast projection
//! - [`adapter`] - Fit/produce state machine, configuration, persisted state
//!
//! # Example
//!
//! ```ignore
//! use kolosal_forecast::prelude::*;
//!
//! let mut adapter = ForecastAdapter::new(AdapterConfig::new().with_horizon(6, 6), model);
//! adapter.fit(&inputs, &outputs)?;
//! let forecasts = adapter.produce(&queries)?;
//! ```

// Core error handling
pub mod error;

// Alignment primitives
pub mod timeseries;
pub mod dataset;

// Model seam and fit/produce surface
pub mod forecast;
pub mod adapter;

pub use error::{ForecastError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{ForecastError, Result};

    // Adapter
    pub use crate::adapter::{AdapterConfig, FittedState, ForecastAdapter, TrainerConfig};

    // Dataset
    pub use crate::dataset::{
        AnnotatedFrame, ColumnRoles, GroupKey, SemanticType, TargetKind, TrainingDataset,
    };

    // Forecasting
    pub use crate::forecast::{
        Distribution, ForecastArray, ForecastModel, ForecastRequest, ModelSettings, PaddingPolicy,
        Statistic,
    };

    // Time series
    pub use crate::timeseries::{Frequency, FrequencyPair, FrequencyUnit, TimePoint};
}
