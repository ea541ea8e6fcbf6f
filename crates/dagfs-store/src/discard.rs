use async_trait::async_trait;
use dagfs_types::Cid;

use crate::error::{StoreError, StoreResult};
use crate::object::DagNode;
use crate::traits::DagNodeStore;

/// A store that computes identifiers and keeps nothing.
///
/// Used when the caller only wants the root identifier of an import.
#[derive(Clone, Copy, Debug, Default)]
pub struct HashOnlyStore;

#[async_trait]
impl DagNodeStore for HashOnlyStore {
    async fn get(&self, _cid: &Cid) -> StoreResult<DagNode> {
        Err(StoreError::NotSupported("hash-only store cannot read"))
    }

    async fn put(&self, node: &DagNode) -> StoreResult<Cid> {
        node.compute_cid()
    }

    async fn has(&self, _cid: &Cid) -> StoreResult<bool> {
        Ok(false)
    }
}
