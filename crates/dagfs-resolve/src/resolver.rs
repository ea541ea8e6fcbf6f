//! The [`PathResolver`] and its traversal algorithm.
//!
//! Resolution runs in two phases:
//!
//! 1. **Name phase.** While the path is rooted at `/ipns/<name>`, look the
//!    name up and splice the record's target in front of the remaining
//!    segments. Each lookup is one hop; more than `max_name_hops` hops fails
//!    with [`ResolveError::RecursionLimitExceeded`], so record cycles
//!    terminate.
//! 2. **Link phase.** From the content root, fetch the current node and
//!    descend through the link whose name equals the next segment, until no
//!    segments remain. The terminal node is always fetched, so a successful
//!    resolution names a block that was retrievable at resolution time.
//!
//! # Invariants
//!
//! - Resolution never writes.
//! - Every store fetch and name lookup runs under the caller's [`Context`].

use std::sync::Arc;

use tracing::debug;

use dagfs_names::NameResolver;
use dagfs_store::{Context, DagNode, DagNodeStore, UnixfsKind};
use dagfs_types::{Cid, Codec, Path, PathRoot, ResolvedPath};

use crate::error::{ResolveError, ResolveResult};

/// What the caller requires the terminal node to be.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Expect {
    #[default]
    Any,
    /// A file: a UnixFS file node or a raw block.
    File,
    /// Something with named children.
    Directory,
}

/// A resolution together with every node fetched on the way down.
#[derive(Clone, Debug)]
pub struct Trail {
    pub resolved: ResolvedPath,
    /// `ancestors[0]` is the content root and `ancestors[i]` is reached
    /// through `segments[i - 1]`. Empty when the path has no segments.
    pub ancestors: Vec<(Cid, DagNode)>,
    pub terminal: DagNode,
}

/// Resolves paths against a node store and a name resolver.
#[derive(Clone)]
pub struct PathResolver {
    store: Arc<dyn DagNodeStore>,
    names: Arc<dyn NameResolver>,
    max_name_hops: usize,
}

impl PathResolver {
    /// Default bound on chained name lookups.
    pub const DEFAULT_MAX_NAME_HOPS: usize = 32;

    pub fn new(store: Arc<dyn DagNodeStore>, names: Arc<dyn NameResolver>) -> Self {
        Self {
            store,
            names,
            max_name_hops: Self::DEFAULT_MAX_NAME_HOPS,
        }
    }

    pub fn with_max_name_hops(mut self, max_name_hops: usize) -> Self {
        self.max_name_hops = max_name_hops;
        self
    }

    pub fn max_name_hops(&self) -> usize {
        self.max_name_hops
    }

    pub fn store(&self) -> &Arc<dyn DagNodeStore> {
        &self.store
    }

    pub fn names(&self) -> &Arc<dyn NameResolver> {
        &self.names
    }

    /// Fetch one node under `ctx`.
    pub async fn fetch(&self, ctx: &Context, cid: &Cid) -> ResolveResult<DagNode> {
        Ok(ctx.run(self.store.get(cid)).await??)
    }

    // ---------------------------------------------------------------
    // Public entry points
    // ---------------------------------------------------------------

    /// Resolve `path` to its terminal identifier.
    pub async fn resolve(&self, ctx: &Context, path: &Path) -> ResolveResult<ResolvedPath> {
        self.resolve_with(ctx, path, Expect::Any).await
    }

    /// Resolve `path` and check the terminal node against `expect`.
    pub async fn resolve_with(
        &self,
        ctx: &Context,
        path: &Path,
        expect: Expect,
    ) -> ResolveResult<ResolvedPath> {
        Ok(self.resolve_trail(ctx, path, expect).await?.resolved)
    }

    /// Resolve `path` and return the terminal node alongside.
    pub async fn resolve_to_node(
        &self,
        ctx: &Context,
        path: &Path,
    ) -> ResolveResult<(ResolvedPath, DagNode)> {
        let trail = self.resolve_trail(ctx, path, Expect::Any).await?;
        Ok((trail.resolved, trail.terminal))
    }

    /// Resolve `segments` relative to the already known node `cid`.
    pub async fn resolve_from(
        &self,
        ctx: &Context,
        cid: Cid,
        segments: &[String],
    ) -> ResolveResult<ResolvedPath> {
        let path = Path::ipfs(cid).with_segments(segments.to_vec())?;
        self.resolve(ctx, &path).await
    }

    /// Follow name records only: the content-rooted equivalent of `path`
    /// and its root identifier.
    pub async fn content_path(&self, ctx: &Context, path: &Path) -> ResolveResult<(Path, Cid)> {
        let mut current = path.clone();
        let mut hops = 0;
        loop {
            let name = match current.root() {
                PathRoot::Cid(cid) => return Ok((current.clone(), *cid)),
                PathRoot::Name(name) => name.clone(),
            };
            if hops == self.max_name_hops {
                return Err(ResolveError::RecursionLimitExceeded {
                    name,
                    limit: self.max_name_hops,
                });
            }
            let target = ctx.run(self.names.lookup(&name)).await??;
            hops += 1;
            debug!(name = %name, hop = hops, target = %target, "followed name record");

            let mut segments = target.segments().to_vec();
            segments.extend(current.segments().iter().cloned());
            current = target.with_segments(segments)?;
        }
    }

    /// Resolve `path`, keeping every node on the way down.
    pub async fn resolve_trail(
        &self,
        ctx: &Context,
        path: &Path,
        expect: Expect,
    ) -> ResolveResult<Trail> {
        let (content, root) = self.content_path(ctx, path).await?;

        let mut cid = root;
        let mut ancestors = Vec::with_capacity(content.segments().len());
        for (depth, segment) in content.segments().iter().enumerate() {
            let node = self.fetch(ctx, &cid).await?;
            if !has_named_children(&node)? {
                return Err(ResolveError::NotADirectory {
                    path: display_prefix(&content, depth),
                });
            }
            let next = match node.link(segment) {
                Some(link) => link.cid,
                None => {
                    return Err(ResolveError::NotFound {
                        path: display_prefix(&content, depth),
                        segment: segment.clone(),
                    })
                }
            };
            debug!(node = %cid.short_hex(), segment = %segment, child = %next.short_hex(), "descended");
            ancestors.push((cid, node));
            cid = next;
        }

        let terminal = self.fetch(ctx, &cid).await?;
        let consumed = content.segments().len();
        check_expectation(&terminal, expect, || display_prefix(&content, consumed))?;

        Ok(Trail {
            resolved: ResolvedPath::new(path.clone(), content, cid, consumed),
            ancestors,
            terminal,
        })
    }
}

impl std::fmt::Debug for PathResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathResolver")
            .field("max_name_hops", &self.max_name_hops)
            .finish_non_exhaustive()
    }
}

/// Whether segments may be resolved below `node`.
fn has_named_children(node: &DagNode) -> ResolveResult<bool> {
    Ok(match node.codec() {
        Codec::Raw => false,
        Codec::DagCbor => true,
        Codec::DagPb => node.kind()? == UnixfsKind::Directory,
    })
}

fn check_expectation(
    node: &DagNode,
    expect: Expect,
    path: impl FnOnce() -> String,
) -> ResolveResult<()> {
    match expect {
        Expect::Any => Ok(()),
        Expect::File => match (node.codec(), node.kind()?) {
            (Codec::Raw, _) | (Codec::DagPb, UnixfsKind::File) => Ok(()),
            (Codec::DagPb, UnixfsKind::Directory) => {
                Err(ResolveError::IsDirectory { path: path() })
            }
            (_, kind) => Err(ResolveError::NotAFile { path: path(), kind }),
        },
        Expect::Directory if has_named_children(node)? => Ok(()),
        Expect::Directory => Err(ResolveError::NotADirectory { path: path() }),
    }
}

/// `content` cut after its first `depth` segments, as text.
fn display_prefix(content: &Path, depth: usize) -> String {
    let mut out = format!("/{}/{}", content.namespace(), content.root());
    for segment in &content.segments()[..depth] {
        out.push('/');
        out.push_str(segment);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagfs_names::{InMemoryNameStore, NameError};
    use dagfs_store::{InMemoryDagStore, Interrupted, Link, StoreError, UnixfsData};
    use dagfs_types::HashAlgorithm;

    const ALG: HashAlgorithm = HashAlgorithm::Sha2_256;

    struct Fixture {
        store: Arc<InMemoryDagStore>,
        names: Arc<InMemoryNameStore>,
        resolver: PathResolver,
        root: Cid,
        b: Cid,
        c: Cid,
    }

    async fn put_dir(store: &InMemoryDagStore, name: &str, child: Cid, size: u64) -> Cid {
        let node = DagNode::unixfs(
            vec![Link::new(name, child, size)],
            &UnixfsData::directory(),
            ALG,
        )
        .unwrap();
        store.put(&node).await.unwrap()
    }

    /// `root/A/b/c`, where `c` is a file.
    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryDagStore::new());
        let names = Arc::new(InMemoryNameStore::new());
        let file = DagNode::unixfs(vec![], &UnixfsData::file(b"hello".to_vec()), ALG).unwrap();
        let c = store.put(&file).await.unwrap();
        let b = put_dir(&store, "c", c, 10).await;
        let a = put_dir(&store, "b", b, 20).await;
        let root = put_dir(&store, "A", a, 30).await;
        let resolver = PathResolver::new(store.clone(), names.clone());
        Fixture {
            store,
            names,
            resolver,
            root,
            b,
            c,
        }
    }

    fn path(root: Cid, rest: &str) -> Path {
        Path::parse(&format!("/ipfs/{root}{rest}")).unwrap()
    }

    // ---------------------------------------------------------------
    // Link phase
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn resolves_full_path() {
        let f = fixture().await;
        let ctx = Context::background();
        let resolved = f.resolver.resolve(&ctx, &path(f.root, "/A/b/c")).await.unwrap();
        assert_eq!(resolved.cid(), f.c);
        assert_eq!(resolved.consumed(), 3);
        assert!(resolved.remainder().is_empty());
        assert_eq!(resolved.root(), f.root);
    }

    #[tokio::test]
    async fn zero_segments_resolve_to_root() {
        let f = fixture().await;
        let resolved = f
            .resolver
            .resolve(&Context::background(), &Path::ipfs(f.root))
            .await
            .unwrap();
        assert_eq!(resolved.cid(), f.root);
        assert_eq!(resolved.consumed(), 0);
    }

    #[tokio::test]
    async fn resolution_composes() {
        let f = fixture().await;
        let ctx = Context::background();
        let direct = f.resolver.resolve(&ctx, &path(f.root, "/A/b/c")).await.unwrap();
        let partial = f.resolver.resolve(&ctx, &path(f.root, "/A/b")).await.unwrap();
        assert_eq!(partial.cid(), f.b);
        let rest = f
            .resolver
            .resolve_from(&ctx, partial.cid(), &["c".to_string()])
            .await
            .unwrap();
        assert_eq!(rest.cid(), direct.cid());
    }

    #[tokio::test]
    async fn missing_segment_is_not_found() {
        let f = fixture().await;
        let err = f
            .resolver
            .resolve(&Context::background(), &path(f.root, "/A/x"))
            .await
            .unwrap_err();
        match err {
            ResolveError::NotFound { path, segment } => {
                assert_eq!(segment, "x");
                assert!(path.ends_with("/A"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn segments_below_a_file_fail() {
        let f = fixture().await;
        let err = f
            .resolver
            .resolve(&Context::background(), &path(f.root, "/A/b/c/d"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NotADirectory { .. }));
    }

    #[tokio::test]
    async fn expectations_are_checked() {
        let f = fixture().await;
        let ctx = Context::background();
        let err = f
            .resolver
            .resolve_with(&ctx, &path(f.root, "/A"), Expect::File)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::IsDirectory { .. }));

        let err = f
            .resolver
            .resolve_with(&ctx, &path(f.root, "/A/b/c"), Expect::Directory)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NotADirectory { .. }));

        assert!(f
            .resolver
            .resolve_with(&ctx, &path(f.root, "/A/b/c"), Expect::File)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn resolve_to_node_returns_terminal() {
        let f = fixture().await;
        let (resolved, node) = f
            .resolver
            .resolve_to_node(&Context::background(), &path(f.root, "/A/b/c"))
            .await
            .unwrap();
        assert_eq!(resolved.cid(), f.c);
        assert_eq!(node.unixfs_data().unwrap().unwrap().data, b"hello");
    }

    #[tokio::test]
    async fn trail_records_every_level() {
        let f = fixture().await;
        let trail = f
            .resolver
            .resolve_trail(&Context::background(), &path(f.root, "/A/b"), Expect::Any)
            .await
            .unwrap();
        assert_eq!(trail.ancestors.len(), 2);
        assert_eq!(trail.ancestors[0].0, f.root);
        assert_eq!(trail.resolved.cid(), f.b);
        assert!(trail.terminal.link("c").is_some());
    }

    #[tokio::test]
    async fn missing_block_is_store_not_found() {
        let f = fixture().await;
        f.store.delete(&f.c);
        let err = f
            .resolver
            .resolve(&Context::background(), &path(f.root, "/A/b/c"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(matches!(err, ResolveError::Store(StoreError::NotFound(cid)) if cid == f.c));
    }

    // ---------------------------------------------------------------
    // Name phase
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn name_target_segments_are_prepended() {
        let f = fixture().await;
        f.names.publish("site", path(f.root, "/A")).unwrap();
        let requested = Path::parse("/ipns/site/b/c").unwrap();
        let resolved = f
            .resolver
            .resolve(&Context::background(), &requested)
            .await
            .unwrap();
        assert_eq!(resolved.cid(), f.c);
        assert_eq!(resolved.requested(), &requested);
        assert_eq!(resolved.content(), &path(f.root, "/A/b/c"));
    }

    #[tokio::test]
    async fn chains_within_the_limit_resolve() {
        let f = fixture().await;
        let resolver = f.resolver.clone().with_max_name_hops(3);
        f.names.publish("n0", Path::ipns("n1").unwrap()).unwrap();
        f.names.publish("n1", Path::ipns("n2").unwrap()).unwrap();
        f.names.publish("n2", Path::ipfs(f.root)).unwrap();
        let resolved = resolver
            .resolve(&Context::background(), &Path::parse("/ipns/n0/A/b").unwrap())
            .await
            .unwrap();
        assert_eq!(resolved.cid(), f.b);
    }

    #[tokio::test]
    async fn chains_over_the_limit_fail() {
        let f = fixture().await;
        let resolver = f.resolver.clone().with_max_name_hops(3);
        for i in 0..4 {
            let next = Path::ipns(format!("n{}", i + 1)).unwrap();
            f.names.publish(&format!("n{i}"), next).unwrap();
        }
        f.names.publish("n4", Path::ipfs(f.root)).unwrap();
        let err = resolver
            .resolve(&Context::background(), &Path::ipns("n0").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::RecursionLimitExceeded { limit: 3, .. }
        ));
    }

    #[tokio::test]
    async fn name_cycles_terminate() {
        let f = fixture().await;
        f.names.publish("a", Path::ipns("b").unwrap()).unwrap();
        f.names.publish("b", Path::ipns("a").unwrap()).unwrap();
        let err = f
            .resolver
            .resolve(&Context::background(), &Path::ipns("a").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::RecursionLimitExceeded {
                limit: PathResolver::DEFAULT_MAX_NAME_HOPS,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn unknown_name_is_not_found() {
        let f = fixture().await;
        let err = f
            .resolver
            .resolve(&Context::background(), &Path::ipns("ghost").unwrap())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(matches!(err, ResolveError::Name(NameError::NotFound { .. })));
    }

    #[tokio::test]
    async fn offline_name_is_reported() {
        let f = fixture().await;
        f.names.set_offline(true);
        let err = f
            .resolver
            .resolve(&Context::background(), &Path::ipns("remote").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Offline { .. }));
    }

    // ---------------------------------------------------------------
    // Cancellation
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn cancelled_context_interrupts() {
        let f = fixture().await;
        let (ctx, handle) = Context::with_cancel();
        handle.cancel();
        let err = f
            .resolver
            .resolve(&ctx, &path(f.root, "/A"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Interrupted(Interrupted::Cancelled)));
    }
}
