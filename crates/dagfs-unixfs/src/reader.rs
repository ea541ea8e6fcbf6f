//! Lazy readers over stored UnixFS trees.
//!
//! A [`UnixfsFile`] walks its tree depth-first and fetches one block at a
//! time, so reading a file never holds more than one chunk plus one link
//! list per tree level.

use std::io;
use std::path::{Component, Path as FsPath};

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use dagfs_resolve::{PathResolver, ResolveError};
use dagfs_store::{Context, DagNode, Link, Mtime, UnixfsKind};
use dagfs_types::{Cid, Codec, Path};

use crate::error::{GetError, GetResult};

/// What a path resolved to, ready to read.
#[derive(Debug)]
pub enum UnixfsNode {
    File(UnixfsFile),
    Directory(UnixfsDirectory),
    /// A symlink and its target, exactly as stored.
    Symlink(String),
}

impl UnixfsNode {
    /// Interpret `node` (stored under `cid`) as a file-system node.
    pub fn from_node(
        resolver: PathResolver,
        ctx: Context,
        cid: Cid,
        node: DagNode,
    ) -> GetResult<Self> {
        match node.codec() {
            Codec::Raw => Ok(Self::File(UnixfsFile::new(resolver, ctx, cid, node)?)),
            Codec::DagCbor => Err(GetError::NotSupported(format!(
                "{cid} is dag-cbor, which has no file-system form"
            ))),
            Codec::DagPb => match node.kind()? {
                UnixfsKind::File => Ok(Self::File(UnixfsFile::new(resolver, ctx, cid, node)?)),
                UnixfsKind::Directory => Ok(Self::Directory(UnixfsDirectory::new(
                    resolver, ctx, cid, node,
                )?)),
                UnixfsKind::Symlink => {
                    let target = node
                        .unixfs_data()?
                        .and_then(|data| data.symlink_target())
                        .unwrap_or_default();
                    Ok(Self::Symlink(target))
                }
                UnixfsKind::Raw => Err(GetError::NotSupported(format!(
                    "{cid} carries no file-system payload"
                ))),
            },
        }
    }

    /// Write this node to `dest` on the local filesystem.
    ///
    /// Files and directories get their recorded mode and modification time.
    /// Symlinks are recreated verbatim and only on Unix.
    pub fn write_to<'a>(self, dest: &'a FsPath) -> BoxFuture<'a, GetResult<()>> {
        async move {
            match self {
                Self::File(mut file) => {
                    let mut out = tokio::fs::File::create(dest).await?;
                    while let Some(chunk) = file.next_chunk().await? {
                        out.write_all(&chunk).await?;
                    }
                    out.flush().await?;
                    drop(out);
                    apply_attributes(dest, file.mode(), file.mtime()).await
                }
                Self::Directory(dir) => {
                    tokio::fs::create_dir_all(dest).await?;
                    for link in dir.entries() {
                        check_export_name(&link.name)?;
                        let child = dir.open(&link.name).await?;
                        child.write_to(&dest.join(&link.name)).await?;
                    }
                    apply_attributes(dest, dir.mode(), dir.mtime()).await
                }
                Self::Symlink(target) => write_symlink(&target, dest).await,
            }
        }
        .boxed()
    }
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Frame {
    links: Vec<Link>,
    blocksizes: Vec<u64>,
    next: usize,
}

/// A file's bytes, fetched on demand in link order.
#[derive(Debug)]
pub struct UnixfsFile {
    resolver: PathResolver,
    ctx: Context,
    cid: Cid,
    root: DagNode,
    size: u64,
    mode: Option<u32>,
    mtime: Option<Mtime>,
    stack: Vec<Frame>,
    pending: Option<Bytes>,
    position: u64,
}

impl UnixfsFile {
    fn new(resolver: PathResolver, ctx: Context, cid: Cid, root: DagNode) -> GetResult<Self> {
        let (size, mode, mtime) = match root.unixfs_data()? {
            Some(data) => (data.filesize, data.mode, data.mtime),
            None => (root.data().len() as u64, None, None),
        };
        let mut file = Self {
            resolver,
            ctx,
            cid,
            root: root.clone(),
            size,
            mode,
            mtime,
            stack: Vec::new(),
            pending: None,
            position: 0,
        };
        file.enter(cid, root)?;
        Ok(file)
    }

    pub fn cid(&self) -> Cid {
        self.cid
    }

    /// Total file length in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mode(&self) -> Option<u32> {
        self.mode
    }

    pub fn mtime(&self) -> Option<Mtime> {
        self.mtime
    }

    /// Offset of the next byte [`next_chunk`](Self::next_chunk) returns.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn remaining(&self) -> u64 {
        self.size.saturating_sub(self.position)
    }

    /// The next run of file bytes, or `None` at end of file.
    pub async fn next_chunk(&mut self) -> GetResult<Option<Bytes>> {
        loop {
            if let Some(data) = self.pending.take() {
                if data.is_empty() {
                    continue;
                }
                self.position += data.len() as u64;
                return Ok(Some(data));
            }
            let Some(frame) = self.stack.last_mut() else {
                return Ok(None);
            };
            let Some(link) = frame.links.get(frame.next).cloned() else {
                self.stack.pop();
                continue;
            };
            frame.next += 1;
            let node = self.resolver.fetch(&self.ctx, &link.cid).await?;
            self.enter(link.cid, node)?;
        }
    }

    /// Move to byte `offset`, skipping whole subtrees by their recorded
    /// block sizes. Offsets past the end clamp to the end. Returns the new
    /// position.
    pub async fn seek(&mut self, offset: u64) -> GetResult<u64> {
        let target = offset.min(self.size);
        self.stack.clear();
        self.pending = None;
        self.position = target;

        let mut remaining = target;
        let mut cid = self.cid;
        let mut node = self.root.clone();
        loop {
            let (data, frame) = unpack(cid, node)?;
            if remaining < data.len() as u64 {
                self.pending = Some(data.slice(remaining as usize..));
                self.stack.extend(frame);
                return Ok(target);
            }
            remaining -= data.len() as u64;

            let Some(mut frame) = frame else {
                return Ok(target);
            };
            let mut index = frame.links.len();
            for (i, &size) in frame.blocksizes.iter().enumerate() {
                if remaining < size {
                    index = i;
                    break;
                }
                remaining -= size;
            }
            let Some(link) = frame.links.get(index).cloned() else {
                return Ok(target);
            };
            frame.next = index + 1;
            self.stack.push(frame);
            debug!(node = %cid.short_hex(), child = index, "seek descended");
            cid = link.cid;
            node = self.resolver.fetch(&self.ctx, &cid).await?;
        }
    }

    /// Read everything from the current position on.
    pub async fn read_to_end(&mut self) -> GetResult<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(chunk) = self.next_chunk().await? {
            out.extend_from_slice(&chunk);
        }
        Ok(out)
    }

    pub fn into_stream(self) -> BoxStream<'static, GetResult<Bytes>> {
        stream::try_unfold(self, |mut file| async move {
            let chunk = file.next_chunk().await?;
            Ok::<_, GetError>(chunk.map(|chunk| (chunk, file)))
        })
        .boxed()
    }

    fn enter(&mut self, cid: Cid, node: DagNode) -> GetResult<()> {
        let (data, frame) = unpack(cid, node)?;
        self.pending = Some(data);
        self.stack.extend(frame);
        Ok(())
    }
}

/// Split a file node into its inline bytes and its children.
fn unpack(cid: Cid, node: DagNode) -> GetResult<(Bytes, Option<Frame>)> {
    match node.codec() {
        Codec::Raw => Ok((Bytes::from(node.into_data()), None)),
        Codec::DagCbor => Err(GetError::CorruptFile {
            cid,
            reason: "dag-cbor node inside a file".into(),
        }),
        Codec::DagPb => {
            let links = node.links().to_vec();
            let Some(data) = node.unixfs_data()? else {
                return Err(GetError::CorruptFile {
                    cid,
                    reason: "missing file payload".into(),
                });
            };
            if data.kind != UnixfsKind::File {
                return Err(GetError::CorruptFile {
                    cid,
                    reason: format!("{} node inside a file", data.kind),
                });
            }
            let covered = data
                .blocksizes
                .iter()
                .try_fold(data.data.len() as u64, |total, &size| total.checked_add(size));
            if covered != Some(data.filesize) {
                return Err(GetError::CorruptFile {
                    cid,
                    reason: format!(
                        "file size {} does not match its inline bytes and block sizes",
                        data.filesize
                    ),
                });
            }
            if data.blocksizes.len() != links.len() {
                return Err(GetError::CorruptFile {
                    cid,
                    reason: format!(
                        "{} links but {} block sizes",
                        links.len(),
                        data.blocksizes.len()
                    ),
                });
            }
            let frame = (!links.is_empty()).then(|| Frame {
                links,
                blocksizes: data.blocksizes,
                next: 0,
            });
            Ok((Bytes::from(data.data), frame))
        }
    }
}

// ---------------------------------------------------------------------------
// Directories
// ---------------------------------------------------------------------------

/// An open directory.
#[derive(Debug)]
pub struct UnixfsDirectory {
    resolver: PathResolver,
    ctx: Context,
    cid: Cid,
    node: DagNode,
    mode: Option<u32>,
    mtime: Option<Mtime>,
}

impl UnixfsDirectory {
    fn new(resolver: PathResolver, ctx: Context, cid: Cid, node: DagNode) -> GetResult<Self> {
        let (mode, mtime) = match node.unixfs_data()? {
            Some(data) if data.kind == UnixfsKind::Directory => (data.mode, data.mtime),
            _ => {
                return Err(GetError::NotADirectory {
                    path: Path::ipfs(cid).to_string(),
                })
            }
        };
        Ok(Self {
            resolver,
            ctx,
            cid,
            node,
            mode,
            mtime,
        })
    }

    pub fn cid(&self) -> Cid {
        self.cid
    }

    pub fn mode(&self) -> Option<u32> {
        self.mode
    }

    pub fn mtime(&self) -> Option<Mtime> {
        self.mtime
    }

    /// Links in stored (name) order.
    pub fn entries(&self) -> &[Link] {
        self.node.links()
    }

    pub fn len(&self) -> usize {
        self.node.links().len()
    }

    pub fn is_empty(&self) -> bool {
        self.node.links().is_empty()
    }

    pub(crate) fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub(crate) fn context(&self) -> &Context {
        &self.ctx
    }

    /// Open the entry called `name`.
    pub async fn open(&self, name: &str) -> GetResult<UnixfsNode> {
        let path = Path::ipfs(self.cid)
            .join(name)
            .map_err(ResolveError::from)?;
        let (resolved, node) = self.resolver.resolve_to_node(&self.ctx, &path).await?;
        UnixfsNode::from_node(self.resolver.clone(), self.ctx.clone(), resolved.cid(), node)
    }
}

// ---------------------------------------------------------------------------
// Export helpers
// ---------------------------------------------------------------------------

fn check_export_name(name: &str) -> GetResult<()> {
    let mut components = FsPath::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(GetError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("refusing to export entry {name:?}"),
        ))),
    }
}

async fn apply_attributes(dest: &FsPath, mode: Option<u32>, mtime: Option<Mtime>) -> GetResult<()> {
    if let Some(mtime) = mtime {
        std::fs::File::open(dest)?.set_modified(mtime.to_system_time())?;
    }
    #[cfg(unix)]
    if let Some(mode) = mode {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(dest, std::fs::Permissions::from_mode(mode)).await?;
    }
    #[cfg(not(unix))]
    let _ = mode;
    Ok(())
}

#[cfg(unix)]
async fn write_symlink(target: &str, dest: &FsPath) -> GetResult<()> {
    tokio::fs::symlink(target, dest).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn write_symlink(_target: &str, dest: &FsPath) -> GetResult<()> {
    Err(GetError::NotSupported(format!(
        "cannot create symlink {} on this platform",
        dest.display()
    )))
}
