//! Forecast module
//!
//! The seam to the external probabilistic model and the projection of its
//! per-group outputs back onto query rows.

mod array;
mod model;
mod projector;

pub use array::{ForecastArray, Statistic};
pub use model::{Distribution, ForecastModel, ForecastRequest, ModelSettings};
pub use projector::{ForecastProjector, GroupForecast, PaddingPolicy};
