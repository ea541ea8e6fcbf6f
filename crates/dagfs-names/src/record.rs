//! The record published under a name.

use dagfs_types::Path;
use serde::{Deserialize, Serialize};

/// A name's current target.
///
/// Every publish under the same name bumps `sequence`, so a newer record can
/// always be told apart from a stale one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRecord {
    /// The name this record is published under.
    pub name: String,
    /// What the name points at. May be another `/ipns` path.
    pub value: Path,
    /// Monotonic per-name publish counter, starting at 1.
    pub sequence: u64,
}

impl NameRecord {
    pub fn new(name: impl Into<String>, value: Path, sequence: u64) -> Self {
        Self {
            name: name.into(),
            value,
            sequence,
        }
    }

    /// Whether the target is itself a mutable name.
    pub fn is_chained(&self) -> bool {
        self.value.is_mutable()
    }
}
