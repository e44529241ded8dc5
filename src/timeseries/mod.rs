//! Time series module
//!
//! Provides the time-alignment primitives of the adapter:
//! - Timestamp decoding
//! - Frequency inference and period arithmetic
//! - Series regularization onto uniform grids
//! - Mapping query timestamps onto forecast offsets

mod frequency;
mod interval;
pub(crate) mod nan_serde;
mod regularize;
mod timestamp;

pub use frequency::{
    infer_frequency, infer_from_timestamps, Frequency, FrequencyPair, FrequencyUnit, MAX_GRID_LEN,
};
pub use interval::{IntervalMapper, UNSEEN_GROUP_OFFSET};
pub use regularize::{
    forward_fill, interpolate_linear, RawSeries, RegularizedSeries, SeriesRecord, SeriesRegularizer,
};
pub use timestamp::{from_epoch_seconds, to_epoch_seconds, TimePoint, TimestampEncoding};
