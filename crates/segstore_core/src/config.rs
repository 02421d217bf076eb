//! Task configuration.
//!
//! All options are read once at task setup; an invalid combination is a
//! configuration failure that aborts before any relocation is attempted.

use crate::error::{CoreError, CoreResult};
use crate::grouping::key::GroupingKey;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Default minimum free space to keep on every share: 1 GB.
pub const DEFAULT_MINIMUM_FREE_SPACE: u64 = 1024 * 1024 * 1024;

/// Configuration shared by the maintenance tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root directory of the segmented store. Share directories are its
    /// all-digit subdirectories.
    pub store_root: PathBuf,

    /// Destination directory of the cold archive tier.
    pub archive_dir: Option<PathBuf>,

    /// Minimum free space to keep on every share, in bytes.
    pub minimum_free_space: u64,

    /// Lower bound of the archive window, in bytes.
    pub min_group_size: u64,

    /// Upper bound of the archive window, in bytes.
    pub max_group_size: u64,

    /// Ordered grouping keys, e.g. `"DataSetType#Space, DataSet:merge"`.
    pub grouping_keys: String,

    /// Ids of shares acting as intake points for new data sets.
    pub incoming_shares: BTreeSet<String>,

    /// Ids of shares being emptied for decommissioning.
    pub withdrawing_shares: BTreeSet<String>,

    /// Directory for per-task checkpoint files.
    pub checkpoint_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_root: PathBuf::new(),
            archive_dir: None,
            minimum_free_space: DEFAULT_MINIMUM_FREE_SPACE,
            min_group_size: 0,
            max_group_size: u64::MAX,
            grouping_keys: "All".to_string(),
            incoming_shares: BTreeSet::new(),
            withdrawing_shares: BTreeSet::new(),
            checkpoint_dir: None,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration for the given store root.
    #[must_use]
    pub fn new(store_root: impl Into<PathBuf>) -> Self {
        Self {
            store_root: store_root.into(),
            ..Self::default()
        }
    }

    /// Sets the archive destination directory.
    #[must_use]
    pub fn archive_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = Some(dir.into());
        self
    }

    /// Sets the per-share free-space reserve.
    #[must_use]
    pub const fn minimum_free_space(mut self, bytes: u64) -> Self {
        self.minimum_free_space = bytes;
        self
    }

    /// Sets the archive window.
    #[must_use]
    pub const fn archive_window(mut self, min: u64, max: u64) -> Self {
        self.min_group_size = min;
        self.max_group_size = max;
        self
    }

    /// Sets the ordered grouping-key list.
    #[must_use]
    pub fn grouping_keys(mut self, keys: impl Into<String>) -> Self {
        self.grouping_keys = keys.into();
        self
    }

    /// Sets the directory for per-task checkpoint files.
    #[must_use]
    pub fn checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint_dir = Some(dir.into());
        self
    }

    /// Marks a share as an incoming intake point.
    #[must_use]
    pub fn incoming_share(mut self, id: impl Into<String>) -> Self {
        self.incoming_shares.insert(id.into());
        self
    }

    /// Marks a share as withdrawing (to be fully drained).
    #[must_use]
    pub fn withdrawing_share(mut self, id: impl Into<String>) -> Self {
        self.withdrawing_shares.insert(id.into());
        self
    }

    /// Validates the configuration and parses the grouping keys.
    ///
    /// # Errors
    ///
    /// Returns a configuration failure if the store root is empty, the
    /// archive window is inverted, or a grouping key does not parse.
    pub fn validate(&self) -> CoreResult<Vec<GroupingKey>> {
        if self.store_root.as_os_str().is_empty() {
            return Err(CoreError::configuration("store root is not set"));
        }
        if self.min_group_size > self.max_group_size {
            return Err(CoreError::configuration(format!(
                "minimal group size {} is larger than maximal group size {}",
                self.min_group_size, self.max_group_size
            )));
        }
        GroupingKey::parse_list(&self.grouping_keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_pattern() {
        let config = StoreConfig::new("/store")
            .minimum_free_space(1000)
            .archive_window(25, 100)
            .grouping_keys("Space:merge")
            .incoming_share("1")
            .withdrawing_share("2");

        assert_eq!(config.minimum_free_space, 1000);
        assert_eq!(config.min_group_size, 25);
        assert_eq!(config.max_group_size, 100);
        assert!(config.incoming_shares.contains("1"));
        assert!(config.withdrawing_shares.contains("2"));
        assert_eq!(config.validate().unwrap().len(), 1);
    }

    #[test]
    fn empty_store_root_is_rejected() {
        let err = StoreConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("store root is not set"));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let err = StoreConfig::new("/store")
            .archive_window(100, 25)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("larger than maximal group size"));
    }

    #[test]
    fn bad_grouping_keys_are_rejected_at_setup() {
        let err = StoreConfig::new("/store")
            .grouping_keys("Space, Space:blub")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("Space:blub"));
    }
}
