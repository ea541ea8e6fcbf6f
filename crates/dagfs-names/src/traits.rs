//! The [`NameResolver`] trait defining the name lookup interface.
//!
//! Any backend (in-memory, DHT-backed, DNS-backed) implements this trait to
//! let the path resolver follow `/ipns` roots.

use async_trait::async_trait;
use dagfs_types::Path;

use crate::error::NameResult;

/// Single-hop lookup of mutable names.
///
/// Implementations return the target of exactly one record. They must not
/// follow chains themselves: hop counting belongs to the caller.
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// The path `name` currently points at.
    ///
    /// Returns [`NameError::NotFound`](crate::NameError::NotFound) if no
    /// record exists.
    async fn lookup(&self, name: &str) -> NameResult<Path>;
}
