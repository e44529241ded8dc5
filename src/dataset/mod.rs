//! Dataset module
//!
//! Turns annotated input frames into regularized, grouped training data:
//! - Semantic tags and column role resolution
//! - Group keys with first-seen partitioning
//! - Per-group regularization and summary statistics

mod builder;
mod group;
mod schema;
mod table;

pub use builder::{
    check_window_support, infer_table_frequency, CategoryEncoder, DatasetSummary,
    GroupedDatasetBuilder, RegularizedGroup, TargetKind, TrainStarts, TrainingDataset,
    TrainingSeries,
};
pub use group::{partition, GroupKey};
pub use schema::{ColumnRoles, SemanticType};
pub use table::{AnnotatedFrame, SeriesTable};
