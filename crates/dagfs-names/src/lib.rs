//! Mutable names for dagfs.
//!
//! A name is the root of an `/ipns/<name>` path. Unlike a content identifier
//! it can be re-pointed: each published [`NameRecord`] maps the name to a
//! target [`Path`](dagfs_types::Path), which may itself be another name.
//! Following those chains is the resolver's job; this crate only stores and
//! looks up single records.
//!
//! # Modules
//!
//! - [`error`]: Error types for name operations
//! - [`record`]: The [`NameRecord`] published under a name
//! - [`traits`]: The [`NameResolver`] lookup interface
//! - [`names`]: Name validation
//! - [`memory`]: In-memory [`InMemoryNameStore`] for tests and embedding

pub mod error;
pub mod memory;
pub mod names;
pub mod record;
pub mod traits;

pub use error::{NameError, NameResult};
pub use memory::InMemoryNameStore;
pub use names::validate_name;
pub use record::NameRecord;
pub use traits::NameResolver;
