//! JSON-file-backed metadata provider.
//!
//! Drives the engine from a metadata dump instead of a live database.
//! Share and size updates are written back to the file after every
//! change, using write-then-rename so a crash never corrupts the dump.

use crate::error::CliError;
use segstore_core::dataset::DataSet;
use segstore_core::error::CoreResult;
use segstore_core::provider::MetadataProvider;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk inventory format.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Inventory {
    /// All known data set records.
    pub data_sets: Vec<DataSet>,
    /// Archived container names.
    pub archived_containers: Vec<String>,
    /// Archived data set codes.
    pub archived_data_sets: Vec<String>,
}

/// Metadata provider reading from and writing to one JSON file.
pub struct JsonFileProvider {
    path: PathBuf,
    inventory: Mutex<Inventory>,
}

impl JsonFileProvider {
    /// Opens an inventory file.
    pub fn open(path: &Path) -> Result<Self, CliError> {
        let text = fs::read_to_string(path).map_err(|err| CliError::read(path, err))?;
        let inventory = serde_json::from_str(&text).map_err(|err| CliError::parse(path, err))?;
        Ok(Self {
            path: path.to_path_buf(),
            inventory: Mutex::new(inventory),
        })
    }

    fn persist(&self, inventory: &Inventory) -> CoreResult<()> {
        let temp_path = self.path.with_extension("tmp");
        let text = serde_json::to_string_pretty(inventory)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        fs::write(&temp_path, text)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl MetadataProvider for JsonFileProvider {
    fn list_data_sets(&self) -> CoreResult<Vec<DataSet>> {
        Ok(self.inventory.lock().data_sets.clone())
    }

    fn update_share_and_size(&self, code: &str, share_id: &str, size: u64) -> CoreResult<()> {
        let mut inventory = self.inventory.lock();
        for data_set in &mut inventory.data_sets {
            if data_set.code == code {
                data_set.share_id = share_id.to_string();
                data_set.size = Some(size);
            }
        }
        self.persist(&inventory)
    }

    fn set_size(&self, code: &str, size: u64) -> CoreResult<()> {
        let mut inventory = self.inventory.lock();
        for data_set in &mut inventory.data_sets {
            if data_set.code == code {
                data_set.size = Some(size);
            }
        }
        self.persist(&inventory)
    }

    fn list_archived_containers(&self) -> CoreResult<Vec<String>> {
        Ok(self.inventory.lock().archived_containers.clone())
    }

    fn list_archived_data_sets(&self) -> CoreResult<Vec<String>> {
        Ok(self.inventory.lock().archived_data_sets.clone())
    }
}
