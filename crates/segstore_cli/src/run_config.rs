//! Run configuration file.
//!
//! One JSON file describes a full maintenance run: the store
//! configuration, the inventory file to use as metadata source, and the
//! strategy names resolved against the registries.

use crate::error::CliError;
use segstore_core::StoreConfig;

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

fn default_finder() -> String {
    "max-free-space".to_string()
}

fn default_balancer() -> String {
    "capacity-summary".to_string()
}

fn default_verify_checksums() -> bool {
    true
}

/// Deserialized `--config` file.
#[derive(Debug, Deserialize)]
pub struct RunConfig {
    /// Store configuration, flattened into the top level of the file.
    #[serde(flatten)]
    pub store: StoreConfig,

    /// JSON inventory file backing the metadata provider.
    pub inventory: PathBuf,

    /// Share finder strategy name.
    #[serde(default = "default_finder")]
    pub finder: String,

    /// Balancer strategy name.
    #[serde(default = "default_balancer")]
    pub balancer: String,

    /// Whether relocations verify per-file CRC32 checksums.
    #[serde(default = "default_verify_checksums")]
    pub verify_checksums: bool,
}

impl RunConfig {
    /// Reads and parses a run configuration file.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = fs::read_to_string(path).map_err(|err| CliError::read(path, err))?;
        serde_json::from_str(&text).map_err(|err| CliError::parse(path, err))
    }
}
