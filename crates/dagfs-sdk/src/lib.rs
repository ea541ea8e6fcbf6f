//! High-level API for dagfs.
//!
//! [`CoreApi`] ties a node store, a name resolver and a pin set together and
//! is the main entry point for applications embedding dagfs.

pub mod api;
pub mod config;
pub mod error;

pub use api::CoreApi;
pub use config::CoreConfig;
pub use error::{SdkError, SdkResult};

// Re-export key types
pub use dagfs_crypto::ContentHasher;
pub use dagfs_names::{InMemoryNameStore, NameResolver};
pub use dagfs_resolve::{Expect, PathResolver, ResolveError};
pub use dagfs_store::{
    CancelHandle, Context, DagNode, DagNodeStore, InMemoryDagStore, InMemoryPinStore,
    Interrupted, PinMode, Pinner,
};
pub use dagfs_types::{Cid, Codec, HashAlgorithm, Namespace, Path, ResolvedPath};
pub use dagfs_unixfs::{
    AddError, AddEvent, AddMetaOptions, AddOptions, ChunkerStrategy, DirEntry, FileTree,
    FileType, GetError, GetOptions, LsOptions, MetaError, RemoveMetaOptions, Unixfs, UnixfsNode,
};
