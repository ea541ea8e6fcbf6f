//! Error types for UnixFS import, export and metadata edits.

use std::io;

use dagfs_resolve::ResolveError;
use dagfs_store::{Interrupted, PinError, StoreError};
use dagfs_types::Cid;

/// Errors from parsing or configuring a chunking strategy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkerError {
    #[error("unknown chunker: {0}")]
    Unknown(String),

    /// A recognized strategy this engine does not implement.
    #[error("chunker not supported: {0}")]
    NotSupported(String),

    #[error("invalid chunker {input}: {reason}")]
    InvalidParameter { input: String, reason: String },
}

/// Errors that abort an import.
#[derive(Debug, thiserror::Error)]
pub enum AddError {
    /// Reading the source failed.
    #[error("reading {path}: {source}")]
    Io {
        /// Sub-path within the imported tree.
        path: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Chunker(#[from] ChunkerError),

    /// A directory entry name cannot be used as a link name.
    #[error("invalid entry name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("invalid add options: {0}")]
    InvalidOptions(String),

    #[error("operation not supported: {0}")]
    NotSupported(String),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("pin error: {0}")]
    Pin(#[from] PinError),

    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

impl From<StoreError> for AddError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Interrupted(reason) => Self::Interrupted(reason),
            StoreError::NotSupported(op) => Self::NotSupported(op.to_string()),
            other => Self::Store(other),
        }
    }
}

/// Errors from reading, listing, or exporting a tree.
#[derive(Debug, thiserror::Error)]
pub enum GetError {
    #[error(transparent)]
    Resolve(ResolveError),

    #[error("{path} is not a directory")]
    NotADirectory { path: String },

    #[error("{path} is not a file")]
    NotAFile { path: String },

    /// The terminal node carries no metadata blob.
    #[error("{path} has no metadata")]
    NoMetadata { path: String },

    /// A file node's links and block sizes disagree.
    #[error("corrupt file node {cid}: {reason}")]
    CorruptFile { cid: Cid, reason: String },

    #[error("operation not supported: {0}")]
    NotSupported(String),

    #[error("store error: {0}")]
    Store(StoreError),

    /// Writing an exported tree to the local filesystem failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

impl From<ResolveError> for GetError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Interrupted(reason) => Self::Interrupted(reason),
            other => Self::Resolve(other),
        }
    }
}

impl From<StoreError> for GetError {
    fn from(err: StoreError) -> Self {
        GetError::from(ResolveError::from(err))
    }
}

/// Errors from attaching or clearing file metadata.
#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    #[error(transparent)]
    Resolve(ResolveError),

    /// A blob is already attached and `overwrite` was not set.
    #[error("{path} already has metadata")]
    MetadataExists { path: String },

    #[error("{path} has no metadata")]
    NoMetadata { path: String },

    #[error("operation not supported: {0}")]
    NotSupported(String),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("pin error: {0}")]
    Pin(#[from] PinError),

    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

impl From<ResolveError> for MetaError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Interrupted(reason) => Self::Interrupted(reason),
            other => Self::Resolve(other),
        }
    }
}

impl From<StoreError> for MetaError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Interrupted(reason) => Self::Interrupted(reason),
            StoreError::NotSupported(op) => Self::NotSupported(op.to_string()),
            other => Self::Store(other),
        }
    }
}

pub type AddResult<T> = Result<T, AddError>;
pub type GetResult<T> = Result<T, GetError>;
pub type MetaResult<T> = Result<T, MetaError>;
