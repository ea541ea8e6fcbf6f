//! Options for every UnixFS operation.
//!
//! Plain structs with documented defaults; construct with
//! `..Default::default()` and override what you need.

use dagfs_types::HashAlgorithm;

use crate::chunker::ChunkerStrategy;

/// Default fan-out of internal file nodes.
pub const DEFAULT_MAX_LINKS: usize = 174;
/// Default number of children fetched at once by a resolved listing.
pub const DEFAULT_LS_CONCURRENCY: usize = 8;

/// Options for [`Unixfs::add`](crate::Unixfs::add).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddOptions {
    /// Default `size-262144`.
    pub chunker: ChunkerStrategy,
    /// Default `sha2-256`.
    pub hash: HashAlgorithm,
    /// Store file chunks as raw blocks rather than UnixFS leaves. Default on.
    pub raw_leaves: bool,
    /// Most links per internal file node. Default 174.
    pub max_links: usize,
    /// Pin the root recursively once written. Default on.
    pub pin: bool,
    /// Compute identifiers without writing anything. Default off.
    pub only_hash: bool,
    /// Wrap the imported root in a directory holding it under its name.
    pub wrap_with_directory: bool,
    /// Record permission bits from the source. Default off.
    pub preserve_mode: bool,
    /// Record modification times from the source. Default off.
    pub preserve_mtime: bool,
    /// When importing a local tree, follow symlinks instead of storing them.
    pub follow_symlinks: bool,
}

impl Default for AddOptions {
    fn default() -> Self {
        Self {
            chunker: ChunkerStrategy::default(),
            hash: HashAlgorithm::default(),
            raw_leaves: true,
            max_links: DEFAULT_MAX_LINKS,
            pin: true,
            only_hash: false,
            wrap_with_directory: false,
            preserve_mode: false,
            preserve_mtime: false,
            follow_symlinks: false,
        }
    }
}

/// Options for [`Unixfs::get`](crate::Unixfs::get).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Byte offset at which a returned file handle starts reading.
    pub offset: u64,
}

/// Options for [`Unixfs::ls`](crate::Unixfs::ls).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LsOptions {
    /// Fetch every child to fill in its type, size, mode and mtime.
    /// Default off.
    pub resolve_children: bool,
    /// Most child fetches in flight at once. Default 8.
    pub concurrency: usize,
}

impl Default for LsOptions {
    fn default() -> Self {
        Self {
            resolve_children: false,
            concurrency: DEFAULT_LS_CONCURRENCY,
        }
    }
}

/// Options for [`Unixfs::add_metadata`](crate::Unixfs::add_metadata).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AddMetaOptions {
    /// Replace an existing blob instead of failing.
    pub overwrite: bool,
    /// Pin the new root recursively.
    pub pin: bool,
}

/// Options for [`Unixfs::remove_metadata`](crate::Unixfs::remove_metadata).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RemoveMetaOptions {
    /// Pin the new root recursively.
    pub pin: bool,
}
