//! Shim configuration, loadable from TOML.
//!
//! ```toml
//! max_batch_writes = 500
//! max_in_values = 30
//! auto_id_length = 20
//! allow_unscoped_mutations = false
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Longest auto-id the store will generate.
pub const MAX_AUTO_ID_LENGTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShimConfig {
    /// Upper bound on writes committed by one `execute()`.
    #[serde(default = "default_max_batch_writes")]
    pub max_batch_writes: usize,

    /// Upper bound on values in an `in_` / `overlaps` list.
    #[serde(default = "default_max_in_values")]
    pub max_in_values: usize,

    /// Length of store-generated document ids.
    #[serde(default = "default_auto_id_length")]
    pub auto_id_length: usize,

    /// Let `update`/`delete` without predicates touch every record, without
    /// requiring `all()`.
    #[serde(default)]
    pub allow_unscoped_mutations: bool,
}

fn default_max_batch_writes() -> usize {
    500
}

fn default_max_in_values() -> usize {
    30
}

fn default_auto_id_length() -> usize {
    20
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            max_batch_writes: default_max_batch_writes(),
            max_in_values: default_max_in_values(),
            auto_id_length: default_auto_id_length(),
            allow_unscoped_mutations: false,
        }
    }
}

impl ShimConfig {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, Error> {
        let config: ShimConfig = toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&raw)?;
        tracing::debug!(path = %path.display(), "loaded shim config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.max_batch_writes == 0 {
            return Err(Error::Config("max_batch_writes must be at least 1".into()));
        }
        if self.max_in_values == 0 {
            return Err(Error::Config("max_in_values must be at least 1".into()));
        }
        if self.auto_id_length == 0 || self.auto_id_length > MAX_AUTO_ID_LENGTH {
            return Err(Error::Config(format!(
                "auto_id_length must be between 1 and {}",
                MAX_AUTO_ID_LENGTH
            )));
        }
        Ok(())
    }
}
