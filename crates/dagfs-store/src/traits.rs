use async_trait::async_trait;
use dagfs_types::Cid;

use crate::error::{StoreError, StoreResult};
use crate::object::DagNode;

/// Content-addressed node store.
///
/// All implementations must satisfy these invariants:
/// - Nodes are immutable once written: the same node always produces the
///   same [`Cid`], and `put` of an already-present node is a no-op.
/// - `get` returns a node whose encoding hashes to the requested `Cid`, or
///   an error. Corruption is surfaced, never returned as data.
/// - A missing block is [`StoreError::NotFound`]. A block that exists only
///   remotely while the store is offline is [`StoreError::Offline`].
/// - Concurrent reads are always safe.
#[async_trait]
pub trait DagNodeStore: Send + Sync {
    /// Fetch and decode the node addressed by `cid`.
    async fn get(&self, cid: &Cid) -> StoreResult<DagNode>;

    /// Store `node` and return its identifier.
    async fn put(&self, node: &DagNode) -> StoreResult<Cid>;

    /// Whether `cid` is available.
    ///
    /// Default implementation fetches the node. Backends may override.
    async fn has(&self, cid: &Cid) -> StoreResult<bool> {
        match self.get(cid).await {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Fetch several nodes, stopping at the first failure.
    async fn get_many(&self, cids: &[Cid]) -> StoreResult<Vec<DagNode>> {
        let mut nodes = Vec::with_capacity(cids.len());
        for cid in cids {
            nodes.push(self.get(cid).await?);
        }
        Ok(nodes)
    }

    /// Store several nodes and return their identifiers in order.
    async fn put_many(&self, nodes: &[DagNode]) -> StoreResult<Vec<Cid>> {
        let mut cids = Vec::with_capacity(nodes.len());
        for node in nodes {
            cids.push(self.put(node).await?);
        }
        Ok(cids)
    }
}
