//! Error types for path resolution.

use dagfs_names::NameError;
use dagfs_store::{Interrupted, StoreError, UnixfsKind};
use dagfs_types::PathError;

/// Errors that can occur while resolving a path.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// A segment has no matching link in its parent node.
    #[error("no link named {segment:?} under {path}")]
    NotFound {
        /// The path up to (excluding) the missing segment.
        path: String,
        segment: String,
    },

    /// A file was expected but the path names a directory.
    #[error("{path} is a directory")]
    IsDirectory { path: String },

    /// A file was expected but the path names something else.
    #[error("{path} is not a file ({kind})")]
    NotAFile { path: String, kind: UnixfsKind },

    /// Segments remain below a node that has no named children, or a
    /// directory was expected.
    #[error("{path} is not a directory")]
    NotADirectory { path: String },

    /// A chain of name records is longer than the hop limit.
    #[error("name resolution for {name} exceeded {limit} hops")]
    RecursionLimitExceeded { name: String, limit: usize },

    /// Data needed for resolution is only available over the network.
    #[error("{what} is not available offline")]
    Offline { what: String },

    /// The backend does not implement a required operation.
    #[error("operation not supported: {0}")]
    NotSupported(String),

    #[error(transparent)]
    Interrupted(#[from] Interrupted),

    /// A name record pointed at an invalid path.
    #[error("invalid path: {0}")]
    Path(#[from] PathError),

    /// Underlying store failure, propagated verbatim.
    #[error("store error: {0}")]
    Store(StoreError),

    /// Underlying name lookup failure, propagated verbatim.
    #[error("name error: {0}")]
    Name(NameError),
}

impl ResolveError {
    /// Whether the failure means "nothing is there", whichever layer
    /// noticed it.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::Store(StoreError::NotFound(_))
                | Self::Name(NameError::NotFound { .. })
        )
    }
}

impl From<StoreError> for ResolveError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Offline(cid) => Self::Offline {
                what: format!("block {cid}"),
            },
            StoreError::Interrupted(reason) => Self::Interrupted(reason),
            StoreError::NotSupported(op) => Self::NotSupported(op.to_string()),
            other => Self::Store(other),
        }
    }
}

impl From<NameError> for ResolveError {
    fn from(err: NameError) -> Self {
        match err {
            NameError::Offline { name } => Self::Offline {
                what: format!("name {name}"),
            },
            other => Self::Name(other),
        }
    }
}

/// Convenience alias for resolution results.
pub type ResolveResult<T> = Result<T, ResolveError>;
