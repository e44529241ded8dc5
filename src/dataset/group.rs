//! Group keys and stable partitioning

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Values of the grouping columns for one series. The empty key is the
/// single series of an ungrouped table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct GroupKey(Vec<Option<String>>);

impl GroupKey {
    pub fn new(values: Vec<Option<String>>) -> Self {
        Self(values)
    }

    /// Key of an ungrouped table
    pub fn ungrouped() -> Self {
        Self(Vec::new())
    }

    pub fn values(&self) -> &[Option<String>] {
        &self.0
    }

    pub fn is_ungrouped(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for GroupKey {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(|s| Some(s.into())).collect())
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match value {
                Some(v) => write!(f, "{}", v)?,
                None => write!(f, "null")?,
            }
        }
        write!(f, ")")
    }
}

/// Row indices of each group, keyed in first-encountered order
pub fn partition(keys: &[GroupKey]) -> IndexMap<GroupKey, Vec<usize>> {
    let mut groups: IndexMap<GroupKey, Vec<usize>> = IndexMap::new();
    for (row, key) in keys.iter().enumerate() {
        match groups.get_mut(key) {
            Some(rows) => rows.push(row),
            None => {
                groups.insert(key.clone(), vec![row]);
            }
        }
    }
    groups
}
