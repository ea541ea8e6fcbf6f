//! Attaching and clearing the metadata blob on a file root.
//!
//! Nodes are immutable, so an edit writes a new file root and then a new copy
//! of every directory between it and the content root, each pointing at the
//! rewritten child. Everything else is shared with the old tree, which stays
//! valid. Encoding is deterministic, so clearing a blob that was just set
//! reproduces the original root exactly.

use tracing::debug;

use dagfs_resolve::{Expect, PathResolver, ResolveError};
use dagfs_store::{Context, DagNode, Link};
use dagfs_types::{Cid, Codec, Path, ResolvedPath};

use crate::error::{GetError, GetResult, MetaError, MetaResult};

/// The edit applied to the file root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum MetaChange {
    Set { blob: Vec<u8>, overwrite: bool },
    Clear,
}

/// The blob attached to the file at `path`.
pub(crate) async fn read(resolver: &PathResolver, ctx: &Context, path: &Path) -> GetResult<Vec<u8>> {
    let (resolved, node) = resolver.resolve_to_node(ctx, path).await?;
    node.unixfs_data()?
        .and_then(|data| data.metadata)
        .ok_or_else(|| GetError::NoMetadata {
            path: resolved.content().to_string(),
        })
}

/// Apply `change` to the file at `path` and rebuild its ancestors.
pub(crate) async fn edit(
    resolver: &PathResolver,
    ctx: &Context,
    path: &Path,
    change: MetaChange,
) -> MetaResult<ResolvedPath> {
    let trail = resolver.resolve_trail(ctx, path, Expect::File).await?;
    let content = trail.resolved.content();
    let display = content.to_string();

    if trail.terminal.codec() == Codec::Raw {
        return Err(MetaError::NotSupported(format!(
            "{display} is a raw block and cannot carry metadata"
        )));
    }
    let Some(mut data) = trail.terminal.unixfs_data()? else {
        return Err(MetaError::NotSupported(format!(
            "{display} has no file-system payload"
        )));
    };

    match change {
        MetaChange::Set { blob, overwrite } => {
            if data.metadata.is_some() && !overwrite {
                return Err(MetaError::MetadataExists { path: display });
            }
            data.metadata = Some(blob);
        }
        MetaChange::Clear => {
            if data.metadata.take().is_none() {
                return Err(MetaError::NoMetadata { path: display });
            }
        }
    }

    let terminal = DagNode::unixfs(
        trail.terminal.links().to_vec(),
        &data,
        trail.terminal.algorithm(),
    )?;
    let (terminal_cid, mut size) = put(resolver, ctx, &terminal).await?;

    let segments = content.segments();
    let mut cid = terminal_cid;
    for (depth, (_, ancestor)) in trail.ancestors.iter().enumerate().rev() {
        let segment = &segments[depth];
        let links = ancestor
            .links()
            .iter()
            .map(|link| {
                if link.name == *segment {
                    Link::new(segment.clone(), cid, size)
                } else {
                    link.clone()
                }
            })
            .collect();
        (cid, size) = put(resolver, ctx, &ancestor.with_links(links)?).await?;
    }

    debug!(
        old_root = %trail.resolved.root().short_hex(),
        new_root = %cid.short_hex(),
        file = %terminal_cid.short_hex(),
        "rewrote file metadata"
    );

    let rebuilt = Path::from_cid(content.namespace(), cid)
        .with_segments(segments.to_vec())
        .map_err(ResolveError::from)?;
    Ok(ResolvedPath::new(
        rebuilt.clone(),
        rebuilt,
        terminal_cid,
        trail.resolved.consumed(),
    ))
}

async fn put(resolver: &PathResolver, ctx: &Context, node: &DagNode) -> MetaResult<(Cid, u64)> {
    let cid = ctx.run(resolver.store().put(node)).await??;
    Ok((cid, node.cumulative_size()?))
}
