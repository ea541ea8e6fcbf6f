use std::path::Path;

use serde::{Deserialize, Serialize};

use dagfs_resolve::PathResolver;
use dagfs_types::HashAlgorithm;
use dagfs_unixfs::{
    AddOptions, ChunkerStrategy, LsOptions, DEFAULT_LS_CONCURRENCY, DEFAULT_MAX_LINKS,
};

use crate::error::{SdkError, SdkResult};

/// Defaults applied by [`CoreApi`](crate::CoreApi). Every field may be
/// omitted from a config file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub max_name_hops: usize,
    pub ls_concurrency: usize,
    pub chunker: ChunkerStrategy,
    pub hash: HashAlgorithm,
    pub raw_leaves: bool,
    pub max_links: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_name_hops: PathResolver::DEFAULT_MAX_NAME_HOPS,
            ls_concurrency: DEFAULT_LS_CONCURRENCY,
            chunker: ChunkerStrategy::default(),
            hash: HashAlgorithm::default(),
            raw_leaves: true,
            max_links: DEFAULT_MAX_LINKS,
        }
    }
}

impl CoreConfig {
    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> SdkResult<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> SdkResult<()> {
        if self.max_links < 2 {
            return Err(SdkError::InvalidConfig(format!(
                "max_links must be at least 2, got {}",
                self.max_links
            )));
        }
        if self.ls_concurrency == 0 {
            return Err(SdkError::InvalidConfig("ls_concurrency must be positive".into()));
        }
        self.chunker
            .check()
            .map_err(|e| SdkError::InvalidConfig(e.to_string()))
    }

    /// Import options seeded from this config.
    pub fn add_options(&self) -> AddOptions {
        AddOptions {
            chunker: self.chunker,
            hash: self.hash,
            raw_leaves: self.raw_leaves,
            max_links: self.max_links,
            ..AddOptions::default()
        }
    }

    pub fn ls_options(&self) -> LsOptions {
        LsOptions {
            concurrency: self.ls_concurrency,
            ..LsOptions::default()
        }
    }
}
