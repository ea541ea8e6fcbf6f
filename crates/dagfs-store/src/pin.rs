use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use async_trait::async_trait;
use dagfs_types::Cid;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How much of a graph a pin protects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinMode {
    /// Only the named block.
    Direct,
    /// The block and everything reachable from it.
    Recursive,
}

impl fmt::Display for PinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Recursive => write!(f, "recursive"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PinError {
    #[error("{0} is not pinned")]
    NotPinned(Cid),
}

/// Records which roots must survive garbage collection.
#[async_trait]
pub trait Pinner: Send + Sync {
    /// Pin `cid`. A recursive pin replaces a direct one, never the reverse.
    async fn pin(&self, cid: &Cid, mode: PinMode) -> Result<(), PinError>;

    async fn unpin(&self, cid: &Cid) -> Result<(), PinError>;

    async fn pin_mode(&self, cid: &Cid) -> Result<Option<PinMode>, PinError>;

    async fn is_pinned(&self, cid: &Cid) -> Result<bool, PinError> {
        Ok(self.pin_mode(cid).await?.is_some())
    }
}

/// In-memory pin set.
#[derive(Default)]
pub struct InMemoryPinStore {
    pins: RwLock<HashMap<Cid, PinMode>>,
}

impl InMemoryPinStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pins.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every pin, sorted by identifier.
    pub fn list(&self) -> Vec<(Cid, PinMode)> {
        let map = self.pins.read().expect("lock poisoned");
        let mut pins: Vec<(Cid, PinMode)> = map.iter().map(|(c, m)| (*c, *m)).collect();
        pins.sort_by_key(|(cid, _)| *cid);
        pins
    }
}

#[async_trait]
impl Pinner for InMemoryPinStore {
    async fn pin(&self, cid: &Cid, mode: PinMode) -> Result<(), PinError> {
        let mut map = self.pins.write().expect("lock poisoned");
        let entry = map.entry(*cid).or_insert(mode);
        if mode == PinMode::Recursive {
            *entry = PinMode::Recursive;
        }
        debug!(node = %cid.short_hex(), mode = %entry, "pinned");
        Ok(())
    }

    async fn unpin(&self, cid: &Cid) -> Result<(), PinError> {
        let mut map = self.pins.write().expect("lock poisoned");
        map.remove(cid).map(|_| ()).ok_or(PinError::NotPinned(*cid))
    }

    async fn pin_mode(&self, cid: &Cid) -> Result<Option<PinMode>, PinError> {
        Ok(self.pins.read().expect("lock poisoned").get(cid).copied())
    }
}

impl fmt::Debug for InMemoryPinStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryPinStore")
            .field("pin_count", &self.len())
            .finish()
    }
}
