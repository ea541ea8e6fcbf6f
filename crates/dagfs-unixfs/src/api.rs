use std::io;
use std::path::Path as FsPath;
use std::sync::Arc;

use futures::stream::BoxStream;
use tracing::info;

use dagfs_resolve::PathResolver;
use dagfs_store::{Context, DagNodeStore, HashOnlyStore, PinMode, Pinner};
use dagfs_types::{Cid, Namespace, Path, ResolvedPath};

use crate::builder::DagBuilder;
use crate::error::{AddError, AddResult, GetError, GetResult, MetaError, MetaResult};
use crate::event::ProgressSink;
use crate::ls::{self, DirEntry};
use crate::metadata::{self, MetaChange};
use crate::options::{AddMetaOptions, AddOptions, GetOptions, LsOptions, RemoveMetaOptions};
use crate::reader::UnixfsNode;
use crate::tree::FileTree;

/// File-system operations over one store, name resolver and pin set.
///
/// Cheap to clone; clones share the underlying backends.
#[derive(Clone)]
pub struct Unixfs {
    resolver: PathResolver,
    pins: Option<Arc<dyn Pinner>>,
}

impl Unixfs {
    /// Without a pinner, any operation asked to pin fails with
    /// `NotSupported`.
    pub fn new(resolver: PathResolver) -> Self {
        Self {
            resolver,
            pins: None,
        }
    }

    pub fn with_pinner(mut self, pins: Arc<dyn Pinner>) -> Self {
        self.pins = Some(pins);
        self
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn pinner(&self) -> Option<&Arc<dyn Pinner>> {
        self.pins.as_ref()
    }

    // -------------------------------------------------------------------
    // Import
    // -------------------------------------------------------------------

    /// Import `tree` and return the path of its root.
    pub async fn add(
        &self,
        ctx: &Context,
        tree: FileTree,
        options: &AddOptions,
    ) -> AddResult<ResolvedPath> {
        self.import(ctx, tree, None, options, None).await
    }

    /// Import `tree` under `name`, which labels progress events and is the
    /// entry name when wrapping.
    pub async fn add_named(
        &self,
        ctx: &Context,
        name: &str,
        tree: FileTree,
        options: &AddOptions,
    ) -> AddResult<ResolvedPath> {
        self.import(ctx, tree, Some(name), options, None).await
    }

    /// Import `tree`, reporting each completed sub-path to `progress`.
    pub async fn add_with_progress(
        &self,
        ctx: &Context,
        tree: FileTree,
        name: Option<&str>,
        options: &AddOptions,
        progress: &mut (dyn ProgressSink + Send),
    ) -> AddResult<ResolvedPath> {
        self.import(ctx, tree, name, options, Some(progress)).await
    }

    /// Import a file or directory from the local filesystem. The root is
    /// named after the last component of `path`.
    pub async fn add_path(
        &self,
        ctx: &Context,
        path: &FsPath,
        options: &AddOptions,
    ) -> AddResult<ResolvedPath> {
        let label = path.display().to_string();
        let owned = path.to_path_buf();
        let follow = options.follow_symlinks;
        let tree = tokio::task::spawn_blocking(move || FileTree::from_path(&owned, follow))
            .await
            .map_err(|e| AddError::Io {
                path: label.clone(),
                source: io::Error::other(e),
            })?
            .map_err(|source| AddError::Io {
                path: label,
                source,
            })?;
        let name = path.file_name().and_then(|name| name.to_str());
        self.import(ctx, tree, name, options, None).await
    }

    async fn import(
        &self,
        ctx: &Context,
        tree: FileTree,
        name: Option<&str>,
        options: &AddOptions,
        progress: Option<&mut (dyn ProgressSink + Send)>,
    ) -> AddResult<ResolvedPath> {
        let pins = match (options.pin && !options.only_hash, &self.pins) {
            (false, _) => None,
            (true, Some(pins)) => Some(pins),
            (true, None) => {
                return Err(AddError::NotSupported(
                    "pinning requested but no pinner is configured".into(),
                ))
            }
        };

        let hash_only = HashOnlyStore;
        let store: &dyn DagNodeStore = if options.only_hash {
            &hash_only
        } else {
            self.resolver.store().as_ref()
        };
        let mut builder = DagBuilder::new(store, ctx, options)?;
        if let Some(progress) = progress {
            builder = builder.with_progress(progress);
        }
        let added = builder.build(tree, name).await?;

        if let Some(pins) = pins {
            ctx.run(pins.pin(&added.cid, PinMode::Recursive)).await??;
        }
        info!(
            root = %added.cid.short_hex(),
            bytes = added.bytes,
            only_hash = options.only_hash,
            "import complete"
        );
        Ok(ResolvedPath::from_cid(Namespace::Ipfs, added.cid))
    }

    // -------------------------------------------------------------------
    // Export
    // -------------------------------------------------------------------

    /// Open whatever `path` resolves to.
    pub async fn get(
        &self,
        ctx: &Context,
        path: &Path,
        options: GetOptions,
    ) -> GetResult<UnixfsNode> {
        let (resolved, node) = self.resolver.resolve_to_node(ctx, path).await?;
        let mut node =
            UnixfsNode::from_node(self.resolver.clone(), ctx.clone(), resolved.cid(), node)?;
        if let UnixfsNode::File(file) = &mut node {
            if options.offset > 0 {
                file.seek(options.offset).await?;
            }
        }
        Ok(node)
    }

    /// The metadata blob attached to the file at `path`.
    pub async fn get_metadata(&self, ctx: &Context, path: &Path) -> GetResult<Vec<u8>> {
        metadata::read(&self.resolver, ctx, path).await
    }

    /// List the directory at `path`.
    pub async fn ls(
        &self,
        ctx: &Context,
        path: &Path,
        options: LsOptions,
    ) -> GetResult<BoxStream<'static, DirEntry>> {
        let (resolved, node) = self.resolver.resolve_to_node(ctx, path).await?;
        match UnixfsNode::from_node(self.resolver.clone(), ctx.clone(), resolved.cid(), node) {
            Ok(UnixfsNode::Directory(dir)) => Ok(ls::list(&dir, options)),
            Ok(_) | Err(GetError::NotSupported(_)) => Err(GetError::NotADirectory {
                path: resolved.content().to_string(),
            }),
            Err(err) => Err(err),
        }
    }

    // -------------------------------------------------------------------
    // Metadata
    // -------------------------------------------------------------------

    /// Attach `blob` to the file at `path`, returning the rebuilt path.
    pub async fn add_metadata(
        &self,
        ctx: &Context,
        path: &Path,
        blob: Vec<u8>,
        options: AddMetaOptions,
    ) -> MetaResult<ResolvedPath> {
        let change = MetaChange::Set {
            blob,
            overwrite: options.overwrite,
        };
        self.edit_metadata(ctx, path, change, options.pin).await
    }

    /// Clear the blob on the file at `path`, returning the rebuilt path.
    pub async fn remove_metadata(
        &self,
        ctx: &Context,
        path: &Path,
        options: RemoveMetaOptions,
    ) -> MetaResult<ResolvedPath> {
        self.edit_metadata(ctx, path, MetaChange::Clear, options.pin)
            .await
    }

    async fn edit_metadata(
        &self,
        ctx: &Context,
        path: &Path,
        change: MetaChange,
        pin: bool,
    ) -> MetaResult<ResolvedPath> {
        let pins = match (pin, &self.pins) {
            (false, _) => None,
            (true, Some(pins)) => Some(pins),
            (true, None) => {
                return Err(MetaError::NotSupported(
                    "pinning requested but no pinner is configured".into(),
                ))
            }
        };
        let edited = metadata::edit(&self.resolver, ctx, path, change).await?;
        if let Some(pins) = pins {
            pin_root(ctx, pins.as_ref(), edited.root()).await?;
        }
        Ok(edited)
    }
}

async fn pin_root(ctx: &Context, pins: &dyn Pinner, root: Cid) -> MetaResult<()> {
    ctx.run(pins.pin(&root, PinMode::Recursive)).await??;
    Ok(())
}

impl std::fmt::Debug for Unixfs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unixfs")
            .field("resolver", &self.resolver)
            .field("pinning", &self.pins.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::ChunkerStrategy;
    use crate::event::AddEvent;
    use dagfs_names::InMemoryNameStore;
    use dagfs_store::{InMemoryDagStore, InMemoryPinStore};
    use futures::StreamExt;

    struct Fixture {
        store: Arc<InMemoryDagStore>,
        pins: Arc<InMemoryPinStore>,
        names: Arc<InMemoryNameStore>,
        unixfs: Unixfs,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryDagStore::new());
        let pins = Arc::new(InMemoryPinStore::new());
        let names = Arc::new(InMemoryNameStore::new());
        let resolver = PathResolver::new(store.clone(), names.clone());
        Fixture {
            unixfs: Unixfs::new(resolver).with_pinner(pins.clone()),
            store,
            pins,
            names,
        }
    }

    // -------------------------------------------------------------------
    // Import
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn add_pins_root() {
        let f = fixture();
        let ctx = Context::background();
        let added = f
            .unixfs
            .add(&ctx, FileTree::file("pinned"), &AddOptions::default())
            .await
            .unwrap();
        assert_eq!(
            f.pins.pin_mode(&added.cid()).await.unwrap(),
            Some(PinMode::Recursive)
        );
    }

    #[tokio::test]
    async fn pin_without_pinner_not_supported() {
        let f = fixture();
        let unixfs = Unixfs::new(f.unixfs.resolver().clone());
        let err = unixfs
            .add(&Context::background(), FileTree::file("x"), &AddOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AddError::NotSupported(_)));
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn only_hash_writes_nothing() {
        let f = fixture();
        let ctx = Context::background();
        let tree = || FileTree::directory([("a", FileTree::file(vec![3u8; 5000]))]);
        let options = AddOptions {
            chunker: ChunkerStrategy::FixedSize(1024),
            ..AddOptions::default()
        };
        let hashed = f
            .unixfs
            .add(&ctx, tree(), &AddOptions { only_hash: true, ..options.clone() })
            .await
            .unwrap();
        assert!(f.store.is_empty());
        assert!(f.pins.is_empty());

        let stored = f.unixfs.add(&ctx, tree(), &options).await.unwrap();
        assert_eq!(hashed.cid(), stored.cid());
        assert!(!f.store.is_empty());
    }

    #[tokio::test]
    async fn progress_reports_every_entry() {
        let f = fixture();
        let mut events: Vec<AddEvent> = Vec::new();
        let mut sink = |event: AddEvent| events.push(event);
        let tree = FileTree::directory([
            ("one", FileTree::file("1")),
            ("two", FileTree::file("22")),
        ]);
        let added = f
            .unixfs
            .add_with_progress(
                &Context::background(),
                tree,
                None,
                &AddOptions::default(),
                &mut sink,
            )
            .await
            .unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[2].name, added.cid().to_string());
        assert_eq!(events[2].bytes, 3);
    }

    #[tokio::test]
    async fn progress_import_runs_on_spawned_task() {
        let f = fixture();
        let unixfs = f.unixfs.clone();
        let tree = FileTree::directory([(
            "dir",
            FileTree::directory([("deep", FileTree::file("x"))]),
        )]);
        let names = tokio::spawn(async move {
            let mut names = Vec::new();
            let mut sink = |event: AddEvent| names.push(event.name);
            unixfs
                .add_with_progress(
                    &Context::background(),
                    tree,
                    Some("top"),
                    &AddOptions::default(),
                    &mut sink,
                )
                .await
                .unwrap();
            names
        })
        .await
        .unwrap();
        assert_eq!(names, vec!["top/dir/deep", "top/dir", "top"]);
    }

    #[tokio::test]
    async fn add_path_names_root_after_file() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("hello.txt");
        std::fs::write(&file, b"hello").unwrap();
        let options = AddOptions {
            wrap_with_directory: true,
            ..AddOptions::default()
        };
        let added = f
            .unixfs
            .add_path(&Context::background(), &file, &options)
            .await
            .unwrap();
        let path = Path::ipfs(added.cid()).join("hello.txt").unwrap();
        let UnixfsNode::File(mut reader) = f
            .unixfs
            .get(&Context::background(), &path, GetOptions::default())
            .await
            .unwrap()
        else {
            panic!("expected a file");
        };
        assert_eq!(reader.read_to_end().await.unwrap(), b"hello");
    }

    // -------------------------------------------------------------------
    // Export
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn get_through_name() {
        let f = fixture();
        let ctx = Context::background();
        let added = f
            .unixfs
            .add(
                &ctx,
                FileTree::directory([("f", FileTree::file("via name"))]),
                &AddOptions::default(),
            )
            .await
            .unwrap();
        f.names.publish("site", Path::ipfs(added.cid())).unwrap();

        let path = Path::parse("/ipns/site/f").unwrap();
        let UnixfsNode::File(mut file) = f
            .unixfs
            .get(&ctx, &path, GetOptions { offset: 4 })
            .await
            .unwrap()
        else {
            panic!("expected a file");
        };
        assert_eq!(file.read_to_end().await.unwrap(), b"name");
    }

    #[tokio::test]
    async fn ls_on_file_is_not_a_directory() {
        let f = fixture();
        let ctx = Context::background();
        let added = f
            .unixfs
            .add(&ctx, FileTree::file("x"), &AddOptions::default())
            .await
            .unwrap();
        let result = f
            .unixfs
            .ls(&ctx, added.content(), LsOptions::default())
            .await;
        assert!(matches!(result, Err(GetError::NotADirectory { .. })));
    }

    #[tokio::test]
    async fn ls_lists_entries() {
        let f = fixture();
        let ctx = Context::background();
        let added = f
            .unixfs
            .add(
                &ctx,
                FileTree::directory([("b", FileTree::file("b")), ("a", FileTree::file("a"))]),
                &AddOptions::default(),
            )
            .await
            .unwrap();
        let names: Vec<String> = f
            .unixfs
            .ls(&ctx, added.content(), LsOptions::default())
            .await
            .unwrap()
            .map(|entry| entry.name)
            .collect()
            .await;
        assert_eq!(names, vec!["a", "b"]);
    }

    // -------------------------------------------------------------------
    // Metadata
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn metadata_roundtrip_with_pin() {
        let f = fixture();
        let ctx = Context::background();
        let added = f
            .unixfs
            .add(
                &ctx,
                FileTree::directory([("doc", FileTree::file("body"))]),
                &AddOptions::default(),
            )
            .await
            .unwrap();
        let path = added.content().join("doc").unwrap();
        let edited = f
            .unixfs
            .add_metadata(
                &ctx,
                &path,
                b"{\"k\":1}".to_vec(),
                AddMetaOptions {
                    pin: true,
                    ..AddMetaOptions::default()
                },
            )
            .await
            .unwrap();
        assert!(f.pins.is_pinned(&edited.root()).await.unwrap());
        assert_eq!(
            f.unixfs.get_metadata(&ctx, edited.content()).await.unwrap(),
            b"{\"k\":1}"
        );

        let restored = f
            .unixfs
            .remove_metadata(&ctx, edited.content(), RemoveMetaOptions::default())
            .await
            .unwrap();
        assert_eq!(restored.root(), added.cid());
        assert!(matches!(
            f.unixfs.get_metadata(&ctx, restored.content()).await,
            Err(GetError::NoMetadata { .. })
        ));
    }

    #[tokio::test]
    async fn cancelled_get_is_interrupted() {
        let f = fixture();
        let added = f
            .unixfs
            .add(&Context::background(), FileTree::file("x"), &AddOptions::default())
            .await
            .unwrap();
        let (ctx, handle) = Context::with_cancel();
        handle.cancel();
        let err = f
            .unixfs
            .get(&ctx, added.content(), GetOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GetError::Interrupted(_)));
    }
}
