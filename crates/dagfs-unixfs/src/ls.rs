//! Directory listings.

use std::fmt;

use futures::stream::{self, BoxStream};
use futures::StreamExt;
use serde::Serialize;

use dagfs_resolve::{PathResolver, ResolveError};
use dagfs_store::{Context, DagNode, Link, Mtime, UnixfsKind};
use dagfs_types::{Cid, Codec};

use crate::options::LsOptions;
use crate::reader::UnixfsDirectory;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    #[default]
    Unknown,
    File,
    Directory,
    Symlink,
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::File => write!(f, "file"),
            Self::Directory => write!(f, "directory"),
            Self::Symlink => write!(f, "symlink"),
        }
    }
}

/// One entry of a listing.
///
/// Shallow listings fill only `name`, `cid` and `cumulative_size`; the rest
/// needs the child itself and is set by resolved listings.
#[derive(Debug, Serialize)]
pub struct DirEntry {
    pub name: String,
    pub cid: Cid,
    /// File bytes, or the target length for symlinks.
    pub size: u64,
    /// Encoded size of the child's whole subtree, as recorded on the link.
    pub cumulative_size: u64,
    pub file_type: FileType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtime: Option<Mtime>,
    /// Why this child could not be inspected. Other entries are unaffected.
    #[serde(skip)]
    pub error: Option<ResolveError>,
}

impl DirEntry {
    fn shallow(link: Link) -> Self {
        Self {
            name: link.name,
            cid: link.cid,
            size: 0,
            cumulative_size: link.size,
            file_type: FileType::Unknown,
            target: None,
            mode: None,
            mtime: None,
            error: None,
        }
    }

    async fn resolved(resolver: &PathResolver, ctx: &Context, link: Link) -> Self {
        let cid = link.cid;
        let mut entry = Self::shallow(link);
        match resolver.fetch(ctx, &cid).await {
            Ok(node) => {
                if let Err(err) = entry.inspect(&node) {
                    entry.error = Some(err);
                }
            }
            Err(err) => entry.error = Some(err),
        }
        entry
    }

    fn inspect(&mut self, node: &DagNode) -> Result<(), ResolveError> {
        match node.codec() {
            Codec::Raw => {
                self.file_type = FileType::File;
                self.size = node.data().len() as u64;
            }
            Codec::DagCbor => {}
            Codec::DagPb => {
                let Some(data) = node.unixfs_data()? else {
                    return Ok(());
                };
                self.file_type = match data.kind {
                    UnixfsKind::File => FileType::File,
                    UnixfsKind::Directory => FileType::Directory,
                    UnixfsKind::Symlink => FileType::Symlink,
                    UnixfsKind::Raw => FileType::Unknown,
                };
                self.size = data.size();
                self.target = data.symlink_target();
                self.mode = data.mode;
                self.mtime = data.mtime;
            }
        }
        Ok(())
    }
}

/// List `dir`. In resolved mode up to `options.concurrency` children are
/// fetched at once and entries arrive in completion order.
pub fn list(dir: &UnixfsDirectory, options: LsOptions) -> BoxStream<'static, DirEntry> {
    let links = dir.entries().to_vec();
    if !options.resolve_children {
        return stream::iter(links.into_iter().map(DirEntry::shallow)).boxed();
    }

    let resolver = dir.resolver().clone();
    let ctx = dir.context().clone();
    stream::iter(links)
        .map(move |link| {
            let resolver = resolver.clone();
            let ctx = ctx.clone();
            async move { DirEntry::resolved(&resolver, &ctx, link).await }
        })
        .buffer_unordered(options.concurrency.max(1))
        .boxed()
}
