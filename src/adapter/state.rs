//! Persisted fitted state

use crate::dataset::{ColumnRoles, TrainingDataset};
use crate::error::Result;
use crate::forecast::ModelSettings;
use crate::timeseries::FrequencyPair;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything produce needs from a successful fit. Model weights are not
/// part of it; they belong to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedState {
    pub roles: ColumnRoles,
    /// Name of the produced column
    pub output_column: String,
    pub frequency: FrequencyPair,
    pub dataset: TrainingDataset,
    pub settings: ModelSettings,
    pub fitted: bool,
}

impl FittedState {
    /// Save the state to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a state saved with [`FittedState::save`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let state = serde_json::from_str(&json)?;
        Ok(state)
    }
}
