use std::sync::Arc;

use tracing::info;

use dagfs_names::{InMemoryNameStore, NameResolver};
use dagfs_resolve::PathResolver;
use dagfs_store::{Context, DagNode, DagNodeStore, InMemoryDagStore, InMemoryPinStore, Pinner};
use dagfs_types::{Cid, Path, ResolvedPath};
use dagfs_unixfs::{AddOptions, LsOptions, Unixfs};

use crate::config::CoreConfig;
use crate::error::SdkResult;

/// High-level dagfs API over one store, name resolver and pin set.
pub struct CoreApi {
    store: Arc<dyn DagNodeStore>,
    names: Arc<dyn NameResolver>,
    pins: Arc<dyn Pinner>,
    resolver: PathResolver,
    unixfs: Unixfs,
    config: CoreConfig,
}

impl CoreApi {
    pub fn new(
        store: Arc<dyn DagNodeStore>,
        names: Arc<dyn NameResolver>,
        pins: Arc<dyn Pinner>,
        config: CoreConfig,
    ) -> SdkResult<Self> {
        config.validate()?;
        let resolver = PathResolver::new(store.clone(), names.clone())
            .with_max_name_hops(config.max_name_hops);
        let unixfs = Unixfs::new(resolver.clone()).with_pinner(pins.clone());
        info!(
            chunker = %config.chunker,
            hash = %config.hash.name(),
            max_name_hops = config.max_name_hops,
            "dagfs core ready"
        );
        Ok(Self {
            store,
            names,
            pins,
            resolver,
            unixfs,
            config,
        })
    }

    /// Fresh in-memory backends with the default configuration.
    pub fn in_memory() -> Self {
        let config = CoreConfig::default();
        let resolver = PathResolver::new(
            Arc::new(InMemoryDagStore::new()),
            Arc::new(InMemoryNameStore::new()),
        );
        let pins: Arc<dyn Pinner> = Arc::new(InMemoryPinStore::new());
        Self {
            store: resolver.store().clone(),
            names: resolver.names().clone(),
            unixfs: Unixfs::new(resolver.clone()).with_pinner(pins.clone()),
            pins,
            resolver,
            config,
        }
    }

    // ---- Accessors ----

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DagNodeStore> {
        &self.store
    }

    pub fn names(&self) -> &Arc<dyn NameResolver> {
        &self.names
    }

    pub fn pins(&self) -> &Arc<dyn Pinner> {
        &self.pins
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// UnixFS import, export, listing and metadata.
    pub fn unixfs(&self) -> &Unixfs {
        &self.unixfs
    }

    /// Import options carrying the configured chunker, hash and layout.
    pub fn add_options(&self) -> AddOptions {
        self.config.add_options()
    }

    pub fn ls_options(&self) -> LsOptions {
        self.config.ls_options()
    }

    // ---- Paths ----

    pub fn parse_path(&self, raw: &str) -> SdkResult<Path> {
        Ok(Path::parse(raw)?)
    }

    pub fn ipfs_path(&self, cid: Cid) -> Path {
        Path::ipfs(cid)
    }

    pub fn ipld_path(&self, cid: Cid) -> Path {
        Path::ipld(cid)
    }

    pub async fn resolve_path(&self, ctx: &Context, path: &Path) -> SdkResult<ResolvedPath> {
        Ok(self.resolver.resolve(ctx, path).await?)
    }

    pub async fn resolve_node(
        &self,
        ctx: &Context,
        path: &Path,
    ) -> SdkResult<(ResolvedPath, DagNode)> {
        Ok(self.resolver.resolve_to_node(ctx, path).await?)
    }
}

impl std::fmt::Debug for CoreApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreApi")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
