//! UnixFS import and export for dagfs.
//!
//! Files, directories and symlinks are stored as trees of
//! [`DagNode`](dagfs_store::DagNode)s:
//!
//! - **Import** ([`Unixfs::add`]): a [`FileTree`] is chunked by a
//!   [`Chunker`], chunks become leaves, and leaves are gathered into a
//!   balanced tree of at most `max_links` children per node. Directory links
//!   are sorted by name, so identical input always produces the same root.
//! - **Export** ([`Unixfs::get`]): a [`UnixfsNode`] reads file bytes lazily
//!   in link order, seeks by recorded block sizes, and can write a whole tree
//!   back to the local filesystem.
//! - **Listing** ([`Unixfs::ls`]): a stream of [`DirEntry`]s, optionally
//!   resolving every child with bounded concurrency.
//! - **Metadata** ([`Unixfs::add_metadata`]): attach an opaque blob to a
//!   file root, rewriting the ancestors up to a new root.

pub mod api;
pub mod builder;
pub mod chunker;
pub mod error;
pub mod event;
pub mod ls;
mod metadata;
pub mod options;
pub mod reader;
pub mod tree;

pub use api::Unixfs;
pub use builder::{Added, DagBuilder};
pub use chunker::{Chunker, ChunkerStrategy, DEFAULT_CHUNK_SIZE};
pub use error::{AddError, AddResult, ChunkerError, GetError, GetResult, MetaError, MetaResult};
pub use event::{AddEvent, ProgressSink};
pub use ls::{DirEntry, FileType};
pub use options::{
    AddMetaOptions, AddOptions, GetOptions, LsOptions, RemoveMetaOptions, DEFAULT_LS_CONCURRENCY,
    DEFAULT_MAX_LINKS,
};
pub use reader::{UnixfsDirectory, UnixfsFile, UnixfsNode};
pub use tree::{DirectorySource, FileSource, FileTree};
