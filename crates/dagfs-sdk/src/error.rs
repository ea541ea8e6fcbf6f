use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("invalid path: {0}")]
    Path(#[from] dagfs_types::PathError),

    #[error("resolve error: {0}")]
    Resolve(#[from] dagfs_resolve::ResolveError),

    #[error("add error: {0}")]
    Add(#[from] dagfs_unixfs::AddError),

    #[error("get error: {0}")]
    Get(#[from] dagfs_unixfs::GetError),

    #[error("metadata error: {0}")]
    Meta(#[from] dagfs_unixfs::MetaError),

    #[error("reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsing config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type SdkResult<T> = Result<T, SdkError>;
