use dagfs_types::Cid;

use crate::context::Interrupted;

/// Errors from node store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested block is not in the store.
    #[error("block not found: {0}")]
    NotFound(Cid),

    /// Content hash mismatch on read (data corruption).
    #[error("hash mismatch for {cid}: computed {computed}")]
    HashMismatch { cid: Cid, computed: Cid },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The block bytes cannot be decoded as the codec its identifier claims.
    #[error("corrupt node {cid}: {reason}")]
    CorruptNode { cid: Cid, reason: String },

    /// The node violates a structural rule (e.g. a raw block with links).
    #[error("invalid node: {0}")]
    InvalidNode(String),

    /// The block is not available locally and the store may not go online.
    #[error("block {0} is not available offline")]
    Offline(Cid),

    /// The backend does not implement this operation.
    #[error("operation not supported: {0}")]
    NotSupported(&'static str),

    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
