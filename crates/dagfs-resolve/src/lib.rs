//! Path resolution for dagfs.
//!
//! Turns a [`Path`](dagfs_types::Path) into a
//! [`ResolvedPath`](dagfs_types::ResolvedPath) by following `/ipns` name
//! records to a content root and then descending one named link per segment.
//! Resolution only reads: it is safe to run any number of resolutions
//! concurrently against the same store.

pub mod error;
pub mod resolver;

pub use error::{ResolveError, ResolveResult};
pub use resolver::{Expect, PathResolver, Trail};
