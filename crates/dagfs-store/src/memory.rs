use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use dagfs_crypto::ContentHasher;
use dagfs_types::Cid;
use tracing::trace;

use crate::error::{StoreError, StoreResult};
use crate::object::DagNode;
use crate::traits::DagNodeStore;

/// In-memory, HashMap-based node store.
///
/// Intended for tests and embedding. Blocks are held as encoded bytes behind
/// a `RwLock`, and every read re-verifies the digest before decoding.
pub struct InMemoryDagStore {
    blocks: RwLock<HashMap<Cid, Vec<u8>>>,
}

impl InMemoryDagStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            blocks: RwLock::new(HashMap::new()),
        }
    }

    /// Number of blocks currently stored.
    pub fn len(&self) -> usize {
        self.blocks.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blocks.read().expect("lock poisoned").is_empty()
    }

    /// Total encoded bytes across all stored blocks.
    pub fn total_bytes(&self) -> u64 {
        self.blocks
            .read()
            .expect("lock poisoned")
            .values()
            .map(|bytes| bytes.len() as u64)
            .sum()
    }

    /// Remove all blocks from the store.
    pub fn clear(&self) {
        self.blocks.write().expect("lock poisoned").clear();
    }

    /// Return a sorted list of every stored identifier.
    pub fn all_cids(&self) -> Vec<Cid> {
        let map = self.blocks.read().expect("lock poisoned");
        let mut cids: Vec<Cid> = map.keys().copied().collect();
        cids.sort();
        cids
    }

    /// Whether `cid` is held locally, without decoding it.
    pub fn contains(&self, cid: &Cid) -> bool {
        self.blocks.read().expect("lock poisoned").contains_key(cid)
    }

    /// Delete a block. Returns `true` if it existed.
    ///
    /// Intended for garbage collection only. Deleting a referenced block
    /// leaves dangling links.
    pub fn delete(&self, cid: &Cid) -> bool {
        self.blocks
            .write()
            .expect("lock poisoned")
            .remove(cid)
            .is_some()
    }

    /// Store `bytes` under `cid` without hashing them.
    ///
    /// Used to import blocks whose identity is already known, and to simulate
    /// on-disk corruption in tests. A mismatch is detected on the next `get`.
    pub fn put_raw(&self, cid: Cid, bytes: Vec<u8>) {
        self.blocks.write().expect("lock poisoned").insert(cid, bytes);
    }
}

impl Default for InMemoryDagStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DagNodeStore for InMemoryDagStore {
    async fn get(&self, cid: &Cid) -> StoreResult<DagNode> {
        let bytes = {
            let map = self.blocks.read().expect("lock poisoned");
            map.get(cid).cloned().ok_or(StoreError::NotFound(*cid))?
        };
        if !ContentHasher::verify(&bytes, cid) {
            let computed = ContentHasher::new(cid.algorithm()).cid(cid.codec(), &bytes);
            return Err(StoreError::HashMismatch {
                cid: *cid,
                computed,
            });
        }
        DagNode::decode(cid, &bytes)
    }

    async fn put(&self, node: &DagNode) -> StoreResult<Cid> {
        let bytes = node.encode()?;
        let cid = ContentHasher::new(node.algorithm()).cid(node.codec(), &bytes);
        let mut map = self.blocks.write().expect("lock poisoned");
        // Same identifier always maps to the same bytes.
        map.entry(cid).or_insert_with(|| {
            trace!(node = %cid.short_hex(), bytes = bytes.len(), "stored block");
            bytes
        });
        Ok(cid)
    }

    async fn has(&self, cid: &Cid) -> StoreResult<bool> {
        Ok(self.contains(cid))
    }
}

impl std::fmt::Debug for InMemoryDagStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryDagStore")
            .field("block_count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Link, UnixfsData};
    use dagfs_types::{Codec, HashAlgorithm};

    fn raw(content: &[u8]) -> DagNode {
        DagNode::raw(content.to_vec(), HashAlgorithm::Sha2_256)
    }

    fn directory(links: Vec<Link>) -> DagNode {
        DagNode::unixfs(links, &UnixfsData::directory(), HashAlgorithm::Sha2_256).unwrap()
    }

    // -----------------------------------------------------------------------
    // Core get/put
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn put_and_get_raw() {
        let store = InMemoryDagStore::new();
        let node = raw(b"hello world");
        let cid = store.put(&node).await.unwrap();
        assert_eq!(cid.codec(), Codec::Raw);

        let read_back = store.get(&cid).await.unwrap();
        assert_eq!(read_back, node);
    }

    #[tokio::test]
    async fn put_and_get_directory() {
        let store = InMemoryDagStore::new();
        let child = store.put(&raw(b"child")).await.unwrap();
        let dir = directory(vec![Link::new("child.txt", child, 5)]);
        let cid = store.put(&dir).await.unwrap();

        let read_back = store.get(&cid).await.unwrap();
        assert_eq!(read_back.links().len(), 1);
        assert_eq!(read_back.link("child.txt").unwrap().cid, child);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = InMemoryDagStore::new();
        let cid = raw(b"never written").compute_cid().unwrap();
        let err = store.get(&cid).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(c) if c == cid));
    }

    // -----------------------------------------------------------------------
    // Content-addressing correctness
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn same_content_produces_same_cid() {
        let store = InMemoryDagStore::new();
        let a = store.put(&raw(b"identical")).await.unwrap();
        let b = store.put(&raw(b"identical")).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn put_returns_computed_cid() {
        let store = InMemoryDagStore::new();
        let node = raw(b"verify me");
        let cid = store.put(&node).await.unwrap();
        assert_eq!(cid, node.compute_cid().unwrap());
    }

    #[tokio::test]
    async fn corrupted_block_is_detected() {
        let store = InMemoryDagStore::new();
        let cid = store.put(&raw(b"original")).await.unwrap();
        store.put_raw(cid, b"tampered".to_vec());
        let err = store.get(&cid).await.unwrap_err();
        assert!(matches!(err, StoreError::HashMismatch { cid: c, .. } if c == cid));
    }

    // -----------------------------------------------------------------------
    // Has / delete
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn has_and_delete() {
        let store = InMemoryDagStore::new();
        let cid = store.put(&raw(b"to-delete")).await.unwrap();
        assert!(store.has(&cid).await.unwrap());
        assert!(store.delete(&cid));
        assert!(!store.has(&cid).await.unwrap());
        assert!(!store.delete(&cid));
    }

    // -----------------------------------------------------------------------
    // Batch operations
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn put_many_and_get_many() {
        let store = InMemoryDagStore::new();
        let nodes = vec![raw(b"batch-1"), raw(b"batch-2"), raw(b"batch-3")];
        let cids = store.put_many(&nodes).await.unwrap();
        assert_eq!(cids.len(), 3);
        assert_eq!(store.get_many(&cids).await.unwrap(), nodes);
    }

    #[tokio::test]
    async fn get_many_fails_on_missing() {
        let store = InMemoryDagStore::new();
        let present = store.put(&raw(b"exists")).await.unwrap();
        let missing = raw(b"missing").compute_cid().unwrap();
        assert!(store.get_many(&[present, missing]).await.is_err());
    }

    // -----------------------------------------------------------------------
    // Utility methods
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn len_total_bytes_and_clear() {
        let store = InMemoryDagStore::default();
        assert!(store.is_empty());
        store.put(&raw(b"12345")).await.unwrap();
        store.put(&raw(b"123456789")).await.unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.total_bytes(), 14);

        store.clear();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn all_cids_is_sorted() {
        let store = InMemoryDagStore::new();
        for content in [&b"aaa"[..], b"bbb", b"ccc"] {
            store.put(&raw(content)).await.unwrap();
        }
        let cids = store.all_cids();
        assert_eq!(cids.len(), 3);
        for w in cids.windows(2) {
            assert!(w[0] <= w[1]);
        }
    }

    #[tokio::test]
    async fn concurrent_reads_are_safe() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryDagStore::new());
        let cid = store.put(&raw(b"shared data")).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.get(&cid).await.unwrap().compute_cid().unwrap() })
            })
            .collect();

        for h in handles {
            assert_eq!(h.await.unwrap(), cid);
        }
    }

    #[test]
    fn debug_format() {
        let store = InMemoryDagStore::new();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryDagStore"));
        assert!(debug.contains("block_count"));
    }
}
