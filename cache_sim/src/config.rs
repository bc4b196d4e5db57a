use anyhow::Result;
use serde::Deserialize;

use crate::{
    cache::CacheModel,
    geometry::{CacheGeometry, ConfigError},
};

/// Construction parameters of a [`CacheModel`], loadable from JSON.
///
/// Missing fields fall back to [`CacheConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub name: String,
    /// bits
    pub address_size: u32,
    /// bits
    pub word_size: u32,
    /// words per line
    pub block_size: u32,
    pub num_lines: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: "Cache".to_owned(),
            address_size: 32,
            word_size: 32,
            block_size: 4,
            num_lines: 8,
        }
    }
}

impl CacheConfig {
    pub fn deser(file: impl std::io::Read) -> Result<CacheConfig> {
        Ok(serde_json::from_reader(file)?)
    }
    pub fn geometry(&self) -> Result<CacheGeometry, ConfigError> {
        CacheGeometry::new(
            self.address_size,
            self.word_size,
            self.block_size,
            self.num_lines,
        )
    }
    pub fn build(&self) -> Result<CacheModel, ConfigError> {
        Ok(CacheModel::with_geometry(&self.name, self.geometry()?))
    }
}
