//! In-memory name store for testing and ephemeral use.
//!
//! [`InMemoryNameStore`] keeps every [`NameRecord`] in a `HashMap` protected
//! by a `RwLock`. It implements [`NameResolver`] and adds the publishing side
//! (`publish`, `unpublish`, `records`).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use dagfs_types::Path;
use tracing::debug;

use crate::error::{NameError, NameResult};
use crate::names::validate_name;
use crate::record::NameRecord;
use crate::traits::NameResolver;

/// An in-memory implementation of [`NameResolver`].
///
/// All data lives in a `HashMap` behind a `RwLock`. Data is lost when the
/// store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryNameStore {
    records: RwLock<HashMap<String, NameRecord>>,
    offline: AtomicBool,
}

impl InMemoryNameStore {
    /// Create a new empty name store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Point `name` at `value`, replacing any previous record.
    ///
    /// Returns the stored record with its new sequence number.
    pub fn publish(&self, name: &str, value: Path) -> NameResult<NameRecord> {
        validate_name(name)?;

        let mut records = self
            .records
            .write()
            .map_err(|e| NameError::Backend(format!("lock poisoned: {e}")))?;
        let sequence = records.get(name).map_or(1, |prev| prev.sequence + 1);
        let record = NameRecord::new(name, value, sequence);
        debug!(name, target = %record.value, sequence, "published name");
        records.insert(name.to_string(), record.clone());
        Ok(record)
    }

    /// Remove the record for `name`. Returns `true` if one existed.
    pub fn unpublish(&self, name: &str) -> NameResult<bool> {
        let mut records = self
            .records
            .write()
            .map_err(|e| NameError::Backend(format!("lock poisoned: {e}")))?;
        Ok(records.remove(name).is_some())
    }

    /// The full record for `name`, if any.
    pub fn record(&self, name: &str) -> NameResult<Option<NameRecord>> {
        let records = self
            .records
            .read()
            .map_err(|e| NameError::Backend(format!("lock poisoned: {e}")))?;
        Ok(records.get(name).cloned())
    }

    /// All records, sorted by name.
    pub fn records(&self) -> NameResult<Vec<NameRecord>> {
        let records = self
            .records
            .read()
            .map_err(|e| NameError::Backend(format!("lock poisoned: {e}")))?;
        let mut result: Vec<NameRecord> = records.values().cloned().collect();
        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    /// While offline, names with no local record report
    /// [`NameError::Offline`] instead of [`NameError::NotFound`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl NameResolver for InMemoryNameStore {
    async fn lookup(&self, name: &str) -> NameResult<Path> {
        validate_name(name)?;
        match self.record(name)? {
            Some(record) => Ok(record.value),
            None if self.is_offline() => Err(NameError::Offline {
                name: name.to_string(),
            }),
            None => Err(NameError::NotFound {
                name: name.to_string(),
            }),
        }
    }
}
