use thiserror::Error;

/// Errors produced while decoding identifiers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unsupported multibase prefix: {0:?}")]
    UnsupportedMultibase(char),

    #[error("unsupported cid version: {0}")]
    UnsupportedVersion(u8),

    #[error("unknown codec: {0}")]
    UnknownCodec(String),

    #[error("unknown hash algorithm: {0}")]
    UnknownHashAlgorithm(String),

    #[error("digest length mismatch: expected {expected}, got {actual}")]
    DigestLength { expected: usize, actual: usize },
}

/// Errors produced by path parsing. Parsing is pure syntax: these are always
/// caller input errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("path {path:?} has no recognized namespace prefix")]
    UnknownNamespace { path: String },

    #[error("path {path:?} has no root segment")]
    MissingRoot { path: String },

    #[error("path {path:?} has an empty segment at position {position}")]
    EmptySegment { path: String, position: usize },

    #[error("invalid path segment {segment:?}: segments must be non-empty and contain no '/'")]
    InvalidSegment { segment: String },

    #[error("path {path:?} has an invalid content root: {source}")]
    InvalidCid {
        path: String,
        #[source]
        source: TypeError,
    },
}
