//! Column semantic types and role resolution

use super::table::AnnotatedFrame;
use crate::error::{ForecastError, Result};
use crate::timeseries::TimestampEncoding;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Semantic tag attached to an input column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SemanticType {
    Target,
    SuggestedTarget,
    TrueTarget,
    /// Time index column
    Time,
    DateTime,
    GroupingKey,
    /// Used for grouping only when no explicit grouping key exists
    SuggestedGroupingKey,
    CategoricalData,
    Integer,
    Float,
}

const TARGET_TYPES: &[SemanticType] = &[
    SemanticType::SuggestedTarget,
    SemanticType::TrueTarget,
    SemanticType::Target,
];
const TIMESTAMP_TYPES: &[SemanticType] = &[SemanticType::Time, SemanticType::DateTime];
const NUMERIC_TYPES: &[SemanticType] = &[SemanticType::Integer, SemanticType::Float];

/// Columns resolved to the roles the adapter works with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRoles {
    pub target: String,
    pub timestamp: String,
    pub timestamp_encoding: TimestampEncoding,
    /// Columns forming the group key; empty for a single ungrouped series
    pub grouping: Vec<String>,
    pub categorical: Vec<String>,
    pub real: Vec<String>,
    /// Tags of the target column, kept for count-data detection
    pub target_semantic_types: Vec<SemanticType>,
}

impl ColumnRoles {
    /// Resolve roles from the semantic tags of `frame`.
    ///
    /// The first target and the first timestamp column win; extra candidates
    /// are reported and ignored. Explicit grouping keys take precedence over
    /// suggested ones.
    pub fn resolve(frame: &AnnotatedFrame) -> Result<Self> {
        let target = first_of(frame.columns_with(TARGET_TYPES), "target").ok_or_else(|| {
            ForecastError::ConfigError("at least one column must be marked as a target".to_string())
        })?;

        let timestamp = first_of(frame.columns_with(TIMESTAMP_TYPES), "timestamp").ok_or_else(|| {
            ForecastError::ConfigError("a column must be marked as the time index".to_string())
        })?;

        let timestamp_encoding = if frame
            .semantic_types(&timestamp)
            .contains(&SemanticType::Integer)
        {
            TimestampEncoding::DayCount
        } else {
            TimestampEncoding::EpochSeconds
        };

        let suggested = frame.columns_with(&[SemanticType::SuggestedGroupingKey]);
        let mut grouping = frame.columns_with(&[SemanticType::GroupingKey]);
        if grouping.is_empty() {
            grouping = suggested.clone();
        }

        let categorical: Vec<String> = frame
            .columns_with(&[SemanticType::CategoricalData])
            .into_iter()
            .filter(|c| !grouping.contains(c) && !suggested.contains(c))
            .collect();

        let real = frame
            .columns_with(NUMERIC_TYPES)
            .into_iter()
            .filter(|c| {
                *c != timestamp
                    && *c != target
                    && !grouping.contains(c)
                    && !categorical.contains(c)
            })
            .collect();

        let target_semantic_types = frame.semantic_types(&target).to_vec();

        Ok(Self {
            target,
            timestamp,
            timestamp_encoding,
            grouping,
            categorical,
            real,
            target_semantic_types,
        })
    }

    pub fn is_grouped(&self) -> bool {
        !self.grouping.is_empty()
    }
}

fn first_of(mut columns: Vec<String>, role: &str) -> Option<String> {
    if columns.len() > 1 {
        warn!(
            role,
            used = %columns[0],
            ignored = ?&columns[1..],
            "More than one column marked for this role; using the first"
        );
    }
    if columns.is_empty() {
        None
    } else {
        Some(columns.swap_remove(0))
    }
}
