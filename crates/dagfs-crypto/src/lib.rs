//! Content hashing for dagfs.
//!
//! Turns encoded block bytes into [`Cid`](dagfs_types::Cid)s. All hashing
//! wraps established libraries (`sha2`, `blake3`).

pub mod hasher;

pub use hasher::ContentHasher;
