//! Error types for name operations.

use thiserror::Error;

/// Errors that can occur while publishing or looking up names.
#[derive(Debug, Error)]
pub enum NameError {
    /// No record is published under the name.
    #[error("name not found: {name}")]
    NotFound { name: String },

    /// The name is syntactically invalid.
    #[error("invalid name: {name}: {reason}")]
    InvalidName { name: String, reason: String },

    /// The record would have to be fetched from the network, and the
    /// resolver is offline.
    #[error("name {name} cannot be resolved offline")]
    Offline { name: String },

    /// The backing store failed.
    #[error("name store error: {0}")]
    Backend(String),
}

/// Convenience alias for name results.
pub type NameResult<T> = std::result::Result<T, NameError>;
