//! gridctl configuration
//!
//! Defaults, then an optional config file, then `GRIDCTL_*` environment
//! variables. Command line flags are applied on top by the caller.

use anyhow::Result;
use common::LogConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment prefix, e.g. `GRIDCTL_MODEL=AC1`, `GRIDCTL_LOG__LEVEL=debug`
pub const ENV_PREFIX: &str = "GRIDCTL_";

pub const DEFAULT_CATALOG: &str = "config/catalog.yaml";
pub const DEFAULT_MODEL: &str = "H1";
pub const DEFAULT_STATE_FILE: &str = "data/gridctl_totals.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridctlConfig {
    /// Catalog document (YAML or JSON)
    pub catalog: PathBuf,
    /// Model to resolve from the catalog
    pub model: String,
    /// Where integration totals are persisted
    pub state_file: PathBuf,
    pub log: LogConfig,
}

impl Default for GridctlConfig {
    fn default() -> Self {
        Self {
            catalog: PathBuf::from(DEFAULT_CATALOG),
            model: DEFAULT_MODEL.to_string(),
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            log: LogConfig {
                app_name: "gridctl".to_string(),
                level: "warn".to_string(),
                ..LogConfig::default()
            },
        }
    }
}

impl GridctlConfig {
    /// Load layered configuration
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Ok(common::load_layered(path, ENV_PREFIX)?)
    }
}
