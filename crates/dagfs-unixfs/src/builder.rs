//! Turns a [`FileTree`] into stored UnixFS nodes.
//!
//! Files are chunked as they are read and every chunk is written as a leaf
//! immediately, so memory use is bounded by one chunk plus the links of one
//! tree level. Leaves are then gathered bottom-up into internal nodes of at
//! most `max_links` children until a single root remains, which yields a
//! balanced tree with every leaf at the same depth.
//!
//! A file that fits in one chunk is stored as a single node with its bytes
//! inline; an empty file is a file node with no data.

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::debug;

use dagfs_store::{Context, DagNode, DagNodeStore, Link, Mtime, UnixfsData};
use dagfs_types::{Cid, Namespace, ResolvedPath};

use crate::chunker::Chunker;
use crate::error::{AddError, AddResult};
use crate::event::{AddEvent, ProgressSink};
use crate::options::AddOptions;
use crate::tree::{BoxedReader, DirectorySource, FileSource, FileTree};

/// A written node as its parent sees it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Added {
    pub cid: Cid,
    /// Cumulative encoded size of the subtree.
    pub size: u64,
    /// File bytes below the node.
    pub bytes: u64,
}

impl Added {
    fn link(&self, name: impl Into<String>) -> Link {
        Link::new(name, self.cid, self.size)
    }
}

/// Writes one import into a store.
pub struct DagBuilder<'a> {
    store: &'a dyn DagNodeStore,
    ctx: &'a Context,
    options: &'a AddOptions,
    progress: Option<&'a mut (dyn ProgressSink + Send)>,
}

impl<'a> DagBuilder<'a> {
    pub fn new(
        store: &'a dyn DagNodeStore,
        ctx: &'a Context,
        options: &'a AddOptions,
    ) -> AddResult<Self> {
        if options.max_links < 2 {
            return Err(AddError::InvalidOptions(format!(
                "max_links must be at least 2, got {}",
                options.max_links
            )));
        }
        options.chunker.check()?;
        Ok(Self {
            store,
            ctx,
            options,
            progress: None,
        })
    }

    pub fn with_progress(mut self, sink: &'a mut (dyn ProgressSink + Send)) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Import `tree`. `name` names the root in progress events and in the
    /// wrapping directory; without one the root's identifier is used.
    pub async fn build(&mut self, tree: FileTree, name: Option<&str>) -> AddResult<Added> {
        if let Some(name) = name {
            check_entry_name(name)?;
        }
        let root = self.build_tree(tree, name.map(str::to_string)).await?;
        if !self.options.wrap_with_directory {
            return Ok(root);
        }

        let entry = name.map_or_else(|| root.cid.to_string(), str::to_string);
        let node = DagNode::unixfs(
            vec![root.link(entry)],
            &UnixfsData::directory(),
            self.options.hash,
        )?;
        let wrapper = self.put(&node, root.bytes).await?;
        self.emit(None, wrapper, None, None);
        Ok(wrapper)
    }

    fn build_tree(&mut self, tree: FileTree, rel: Option<String>) -> BoxFuture<'_, AddResult<Added>> {
        async move {
            match tree {
                FileTree::File(source) => self.build_file(source, rel).await,
                FileTree::Directory(dir) => self.build_directory(dir, rel).await,
                FileTree::Symlink(target) => {
                    let node =
                        DagNode::unixfs(vec![], &UnixfsData::symlink(target), self.options.hash)?;
                    let added = self.put(&node, 0).await?;
                    self.emit(rel, added, None, None);
                    Ok(added)
                }
            }
        }
        .boxed()
    }

    async fn build_directory(
        &mut self,
        dir: DirectorySource,
        rel: Option<String>,
    ) -> AddResult<Added> {
        let (mode, mtime) = self.attributes(dir.mode(), dir.mtime());
        let mut links = Vec::with_capacity(dir.len());
        let mut bytes = 0;
        for (name, child) in dir.into_entries() {
            check_entry_name(&name)?;
            let child_rel = match &rel {
                Some(prefix) => format!("{prefix}/{name}"),
                None => name.clone(),
            };
            let added = self.build_tree(child, Some(child_rel)).await?;
            bytes += added.bytes;
            links.push(added.link(name));
        }

        let data = UnixfsData::directory().with_mode(mode).with_mtime(mtime);
        let node = DagNode::unixfs(links, &data, self.options.hash)?;
        let added = self.put(&node, bytes).await?;
        debug!(node = %added.cid.short_hex(), entries = node.links().len(), "added directory");
        self.emit(rel, added, mode, mtime);
        Ok(added)
    }

    async fn build_file(&mut self, source: FileSource, rel: Option<String>) -> AddResult<Added> {
        let (mode, mtime) = self.attributes(source.mode(), source.mtime());
        let label = rel.clone().unwrap_or_default();
        let reader = source.open().await.map_err(|source| AddError::Io {
            path: label.clone(),
            source,
        })?;
        let mut chunker = Chunker::new(reader, self.options.chunker);

        // The latest chunk is held back until the next one shows whether the
        // file needs a tree at all.
        let mut held = None;
        let mut level: Vec<Added> = Vec::new();
        while let Some(chunk) = self.next_chunk(&mut chunker, &label).await? {
            if let Some(previous) = held.replace(chunk) {
                level.push(self.put_leaf(&previous).await?);
            }
        }

        let added = match held {
            Some(last) if !level.is_empty() => {
                level.push(self.put_leaf(&last).await?);
                self.build_layers(level, mode, mtime).await?
            }
            single => {
                let data = single.map(|chunk| chunk.to_vec()).unwrap_or_default();
                let bytes = data.len() as u64;
                let unixfs = UnixfsData::file(data).with_mode(mode).with_mtime(mtime);
                let node = DagNode::unixfs(vec![], &unixfs, self.options.hash)?;
                self.put(&node, bytes).await?
            }
        };
        debug!(node = %added.cid.short_hex(), bytes = added.bytes, "added file");
        self.emit(rel, added, mode, mtime);
        Ok(added)
    }

    /// Group `level` into parents until one root remains. Only the root
    /// carries `mode` and `mtime`.
    async fn build_layers(
        &mut self,
        mut level: Vec<Added>,
        mode: Option<u32>,
        mtime: Option<Mtime>,
    ) -> AddResult<Added> {
        let max_links = self.options.max_links;
        while level.len() > max_links {
            let mut parents = Vec::with_capacity(level.len().div_ceil(max_links));
            for group in level.chunks(max_links) {
                parents.push(self.put_file_node(group, None, None).await?);
            }
            level = parents;
        }
        self.put_file_node(&level, mode, mtime).await
    }

    async fn put_file_node(
        &mut self,
        children: &[Added],
        mode: Option<u32>,
        mtime: Option<Mtime>,
    ) -> AddResult<Added> {
        let links = children.iter().map(|child| child.link("")).collect();
        let blocksizes: Vec<u64> = children.iter().map(|child| child.bytes).collect();
        let bytes = blocksizes.iter().sum();
        let data = UnixfsData::file_tree(blocksizes)
            .with_mode(mode)
            .with_mtime(mtime);
        let node = DagNode::unixfs(links, &data, self.options.hash)?;
        self.put(&node, bytes).await
    }

    async fn put_leaf(&mut self, chunk: &[u8]) -> AddResult<Added> {
        let node = if self.options.raw_leaves {
            DagNode::raw(chunk.to_vec(), self.options.hash)
        } else {
            DagNode::unixfs(vec![], &UnixfsData::file(chunk.to_vec()), self.options.hash)?
        };
        self.put(&node, chunk.len() as u64).await
    }

    async fn put(&mut self, node: &DagNode, bytes: u64) -> AddResult<Added> {
        let cid = self.ctx.run(self.store.put(node)).await??;
        Ok(Added {
            cid,
            size: node.cumulative_size()?,
            bytes,
        })
    }

    async fn next_chunk(
        &mut self,
        chunker: &mut Chunker<BoxedReader>,
        label: &str,
    ) -> AddResult<Option<bytes::Bytes>> {
        self.ctx
            .run(chunker.next_chunk())
            .await?
            .map_err(|source| AddError::Io {
                path: label.to_string(),
                source,
            })
    }

    fn attributes(&self, mode: Option<u32>, mtime: Option<Mtime>) -> (Option<u32>, Option<Mtime>) {
        (
            mode.filter(|_| self.options.preserve_mode),
            mtime.filter(|_| self.options.preserve_mtime),
        )
    }

    fn emit(&mut self, rel: Option<String>, added: Added, mode: Option<u32>, mtime: Option<Mtime>) {
        if let Some(sink) = self.progress.as_mut() {
            sink.event(AddEvent {
                name: rel.unwrap_or_else(|| added.cid.to_string()),
                path: Some(ResolvedPath::from_cid(Namespace::Ipfs, added.cid)),
                bytes: added.bytes,
                size: added.size,
                mode,
                mtime,
            });
        }
    }
}

fn check_entry_name(name: &str) -> AddResult<()> {
    let reason = if name.is_empty() {
        "empty name"
    } else if name == "." || name == ".." {
        "reserved name"
    } else if name.contains('/') {
        "contains '/'"
    } else if name.contains('\0') {
        "contains a NUL byte"
    } else {
        return Ok(());
    };
    Err(AddError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    })
}
