//! Cache of the most recent produce call

use crate::dataset::SeriesTable;
use crate::forecast::GroupForecast;
use crate::timeseries::to_epoch_seconds;
use xxhash_rust::xxh3::xxh3_64;

/// Fingerprint of a query table's resolved content
pub fn fingerprint(table: &SeriesTable) -> u64 {
    let mut bytes = Vec::with_capacity(table.len() * (16 + table.real.ncols() * 8));

    for t in &table.timestamps {
        bytes.extend_from_slice(&to_epoch_seconds(*t).to_le_bytes());
        bytes.extend_from_slice(&t.and_utc().timestamp_subsec_nanos().to_le_bytes());
    }
    for v in table.target.iter().chain(table.real.iter()) {
        bytes.extend_from_slice(&v.to_bits().to_le_bytes());
    }
    let text = table
        .categorical
        .iter()
        .flatten()
        .chain(table.keys.iter().flat_map(|k| k.values()));
    for value in text {
        match value {
            Some(s) => {
                bytes.push(1);
                bytes.extend_from_slice(&(s.len() as u64).to_le_bytes());
                bytes.extend_from_slice(s.as_bytes());
            }
            None => bytes.push(0),
        }
    }
    bytes.extend_from_slice(&(table.real.ncols() as u64).to_le_bytes());
    bytes.extend_from_slice(&(table.categorical.len() as u64).to_le_bytes());

    xxh3_64(&bytes)
}

/// Forecasts of one produce call, reusable for the same query
#[derive(Debug, Clone)]
pub struct CachedForecast {
    pub fingerprint: u64,
    pub rows: usize,
    pub groups: Vec<GroupForecast>,
}

/// Holds at most one produce result
#[derive(Debug, Clone, Default)]
pub struct ProduceCache {
    entry: Option<CachedForecast>,
}

impl ProduceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached forecasts for a query with this fingerprint
    pub fn get(&self, fingerprint: u64, rows: usize) -> Option<&CachedForecast> {
        self.entry
            .as_ref()
            .filter(|entry| entry.fingerprint == fingerprint && entry.rows == rows)
    }

    /// Replace the cached entry
    pub fn store(&mut self, entry: CachedForecast) {
        self.entry = Some(entry);
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }
}
