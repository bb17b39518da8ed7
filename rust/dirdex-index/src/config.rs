//! Index configuration.

use std::path::{Path, PathBuf};

use dirdex_common::{Result, error::Error, verify_config};
use serde::Deserialize;

pub const DEFAULT_CACHE_SIZE: usize = 1000;
pub const DEFAULT_DUPLICATE_LIMIT: usize = 512;

/// Upper bound for `duplicate_limit`. Keeps the element count that prefixes
/// an inline set far below the integer that the `redi` tag prefix of a
/// redirect marker would read as.
pub const MAX_DUPLICATE_LIMIT: usize = 1 << 24;

/// Settings of one attribute index.
///
/// Deserializes from JSON with every field but `attribute_id` optional:
///
/// ```json
/// { "attribute_id": "ou", "cache_size": 100, "working_directory": "/var/lib/dirdex" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    /// Name of the indexed attribute. Also names the index's subdirectory.
    pub attribute_id: String,

    /// Capacity of the value cache of each backing table and of the overflow
    /// set cache.
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    /// Largest duplicate set kept inline in a table slot.
    #[serde(default = "default_duplicate_limit")]
    pub duplicate_limit: usize,

    /// Root directory for file-backed tables; in-memory tables when absent.
    #[serde(default)]
    pub working_directory: Option<PathBuf>,
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

fn default_duplicate_limit() -> usize {
    DEFAULT_DUPLICATE_LIMIT
}

impl IndexConfig {
    pub fn new(attribute_id: impl Into<String>) -> IndexConfig {
        IndexConfig {
            attribute_id: attribute_id.into(),
            cache_size: DEFAULT_CACHE_SIZE,
            duplicate_limit: DEFAULT_DUPLICATE_LIMIT,
            working_directory: None,
        }
    }

    pub fn from_json(json: &str) -> Result<IndexConfig> {
        let config: IndexConfig = serde_json::from_str(json)
            .map_err(|e| Error::configuration("json", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_cache_size(mut self, cache_size: usize) -> IndexConfig {
        self.cache_size = cache_size;
        self
    }

    pub fn with_duplicate_limit(mut self, duplicate_limit: usize) -> IndexConfig {
        self.duplicate_limit = duplicate_limit;
        self
    }

    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> IndexConfig {
        self.working_directory = Some(dir.into());
        self
    }

    /// Directory holding this index's table files, if file-backed.
    pub fn index_directory(&self) -> Option<PathBuf> {
        self.working_directory
            .as_deref()
            .map(|dir: &Path| dir.join(&self.attribute_id))
    }

    pub fn validate(&self) -> Result<()> {
        verify_config!(attribute_id, !self.attribute_id.is_empty());
        verify_config!(
            attribute_id,
            !self.attribute_id.contains(['/', '\\']) && self.attribute_id != ".."
        );
        verify_config!(cache_size, self.cache_size > 0);
        verify_config!(duplicate_limit, self.duplicate_limit > 0);
        verify_config!(
            duplicate_limit,
            self.duplicate_limit <= MAX_DUPLICATE_LIMIT
        );
        Ok(())
    }
}
