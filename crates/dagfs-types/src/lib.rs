//! Foundation types for dagfs.
//!
//! This crate provides the identifier and path types shared by every other
//! dagfs crate. It performs no I/O and no hashing.
//!
//! # Key Types
//!
//! - [`Cid`]: Self-describing content identifier (codec, hash algorithm, digest)
//! - [`Path`]: Namespaced path (`/ipfs`, `/ipld`, `/ipns`) with remainder segments
//! - [`ResolvedPath`]: A path pinned down to a terminal [`Cid`]

pub mod cid;
pub mod error;
pub mod path;

pub use cid::{Cid, Codec, HashAlgorithm, DIGEST_LEN};
pub use error::{PathError, TypeError};
pub use path::{Namespace, Path, PathRoot, ResolvedPath};
