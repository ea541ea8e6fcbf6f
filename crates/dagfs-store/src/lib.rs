//! Content-addressed DAG node storage for dagfs.
//!
//! Every block in dagfs -- file chunks, internal file nodes, directories,
//! symlinks -- is an immutable [`DagNode`] identified by the [`Cid`] of its
//! encoded bytes.
//!
//! # Node Types
//!
//! - [`DagNode`]: codec-tagged node with named [`Link`]s and a payload
//! - [`UnixfsData`]: the file-system payload carried by `dag-pb` nodes
//!
//! # Interfaces
//!
//! - [`DagNodeStore`]: get/put of nodes by identifier
//! - [`Pinner`]: garbage-collection roots
//! - [`Context`]: cancellation and deadline for every suspension point
//!
//! # Backends
//!
//! - [`InMemoryDagStore`]: `HashMap`-based store for tests and embedding
//! - [`HashOnlyStore`]: computes identifiers without keeping anything
//! - [`InMemoryPinStore`]: `HashMap`-based pin set
//!
//! # Design Rules
//!
//! 1. Nodes are immutable once written (content-addressing guarantees this).
//! 2. Writes are idempotent: identical node, identical key, identical bytes.
//! 3. Concurrent reads and writes of different keys need no coordination.
//! 4. Nothing in this crate interprets links beyond encoding them.
//! 5. All I/O errors are propagated, never silently ignored.
//!
//! [`Cid`]: dagfs_types::Cid

pub mod context;
pub mod discard;
pub mod error;
pub mod memory;
pub mod object;
pub mod pin;
pub mod traits;

pub use context::{CancelHandle, Context, Interrupted};
pub use discard::HashOnlyStore;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryDagStore;
pub use object::{DagNode, Link, Mtime, UnixfsData, UnixfsKind};
pub use pin::{InMemoryPinStore, PinError, PinMode, Pinner};
pub use traits::DagNodeStore;
