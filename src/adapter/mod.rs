//! Adapter module
//!
//! The fit/produce surface: configuration, the fitted state that can be
//! saved and restored, and the cache of the last produce call.

mod cache;
mod config;
mod engine;
mod state;

pub use cache::{fingerprint, CachedForecast, ProduceCache};
pub use config::{AdapterConfig, TrainerConfig};
pub use engine::ForecastAdapter;
pub use state::FittedState;
