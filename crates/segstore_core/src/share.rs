//! Shares of a segmented store.
//!
//! A share is one subdirectory of the store root with its own free-space
//! budget, named by its all-digit id. Shares are loaded fresh on every
//! control-loop pass; no `Share` value survives across invocations.

use crate::config::StoreConfig;
use crate::dataset::DataSet;
use crate::error::{CoreError, CoreResult};
use crate::probe::FreeSpaceProbe;
use crate::provider::MetadataProvider;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// One share and the data sets it currently holds.
#[derive(Debug)]
pub struct Share {
    id: String,
    path: PathBuf,
    incoming: bool,
    withdrawing: bool,
    /// Ordered descending by size.
    data_sets: Vec<DataSet>,
    probed_free_space: u64,
    reclaimed: u64,
    committed: u64,
}

impl Share {
    /// Returns the share id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the share directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the share is an intake point for new data sets.
    #[must_use]
    pub fn is_incoming(&self) -> bool {
        self.incoming
    }

    /// Whether the share is being emptied for decommissioning.
    #[must_use]
    pub fn is_withdrawing(&self) -> bool {
        self.withdrawing
    }

    /// The held data sets, ordered descending by size.
    #[must_use]
    pub fn data_sets(&self) -> &[DataSet] {
        &self.data_sets
    }

    /// Whether the share holds no data sets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data_sets.is_empty()
    }

    /// Total size of all held data sets.
    pub fn total_size(&self) -> CoreResult<u64> {
        crate::dataset::total_size(&self.data_sets)
    }

    /// Current free space: the probed figure, plus everything already
    /// reclaimed by relocations out of this share earlier in this pass,
    /// minus everything committed to it as a relocation target. The probe
    /// result is never refreshed mid-pass.
    #[must_use]
    pub fn free_space(&self) -> u64 {
        (self.probed_free_space + self.reclaimed).saturating_sub(self.committed)
    }

    /// Credits bytes freed by a relocation out of this share.
    pub fn note_reclaimed(&mut self, bytes: u64) {
        self.reclaimed += bytes;
    }

    /// Debits bytes moved into this share.
    pub fn note_committed(&mut self, bytes: u64) {
        self.committed += bytes;
    }

    #[cfg(test)]
    pub(crate) fn data_sets_mut(&mut self) -> &mut Vec<DataSet> {
        &mut self.data_sets
    }
}

/// Lists the share directories below the store root, sorted by id.
///
/// A share directory is a direct subdirectory whose name consists of
/// digits only. A missing or unreadable store root is a configuration
/// failure.
pub fn list_share_dirs(store_root: &Path) -> CoreResult<Vec<(String, PathBuf)>> {
    let entries = fs::read_dir(store_root).map_err(|err| {
        CoreError::configuration(format!(
            "store folder does not exist or cannot be accessed: '{}': {err}",
            store_root.display()
        ))
    })?;
    let mut shares = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if path.is_dir() && !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) {
            shares.push((name, path));
        }
    }
    shares.sort();
    Ok(shares)
}

/// Loads all shares with their data sets and free-space figures.
///
/// Unknown data set sizes are back-filled by measuring the data set
/// directory and written back through the metadata provider before any
/// size-based decision is made. Data sets whose directory no longer
/// exists are reported and left out.
pub fn load_shares(
    config: &StoreConfig,
    probe: &dyn FreeSpaceProbe,
    provider: &dyn MetadataProvider,
) -> CoreResult<Vec<Share>> {
    let share_dirs = list_share_dirs(&config.store_root)?;
    let mut by_id: HashMap<String, Vec<DataSet>> = HashMap::new();

    for mut data_set in provider.list_data_sets()? {
        if data_set.size.is_none() {
            let dir = config
                .store_root
                .join(&data_set.share_id)
                .join(&data_set.location);
            if !dir.exists() {
                warn!(
                    "Data set {} no longer exists in share {}.",
                    data_set.code, data_set.share_id
                );
                continue;
            }
            let size = measure_dir_size(&dir)?;
            info!("Data set {} contains {size} bytes.", data_set.code);
            provider.set_size(&data_set.code, size)?;
            data_set.size = Some(size);
        }
        by_id.entry(data_set.share_id.clone()).or_default().push(data_set);
    }

    let mut shares = Vec::with_capacity(share_dirs.len());
    for (id, path) in share_dirs {
        let mut data_sets = by_id.remove(&id).unwrap_or_default();
        // Stable sort: equal sizes keep provider order.
        data_sets.sort_by(|a, b| b.size.cmp(&a.size));
        let probed_free_space = probe.free_space_bytes(&path)?;
        shares.push(Share {
            incoming: config.incoming_shares.contains(&id),
            withdrawing: config.withdrawing_shares.contains(&id),
            id,
            path,
            data_sets,
            probed_free_space,
            reclaimed: 0,
            committed: 0,
        });
    }
    for (id, data_sets) in by_id {
        for data_set in data_sets {
            warn!(
                "Data set {} belongs to unknown share {id} and is ignored.",
                data_set.code
            );
        }
    }
    Ok(shares)
}

/// Recursively sums the sizes of all files below `dir`.
pub fn measure_dir_size(dir: &Path) -> CoreResult<u64> {
    let mut sum = 0u64;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            sum += measure_dir_size(&path)?;
        } else {
            sum += entry.metadata()?.len();
        }
    }
    Ok(sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::tests_support::ConstProbe;
    use crate::provider::MetadataProvider;
    use parking_lot::Mutex;
    use tempfile::tempdir;

    struct TableProvider {
        data_sets: Mutex<Vec<DataSet>>,
    }

    impl TableProvider {
        fn new(data_sets: Vec<DataSet>) -> Self {
            Self {
                data_sets: Mutex::new(data_sets),
            }
        }
    }

    impl MetadataProvider for TableProvider {
        fn list_data_sets(&self) -> CoreResult<Vec<DataSet>> {
            Ok(self.data_sets.lock().clone())
        }

        fn update_share_and_size(&self, code: &str, share_id: &str, size: u64) -> CoreResult<()> {
            let mut data_sets = self.data_sets.lock();
            for data_set in data_sets.iter_mut() {
                if data_set.code == code {
                    data_set.share_id = share_id.to_string();
                    data_set.size = Some(size);
                }
            }
            Ok(())
        }

        fn set_size(&self, code: &str, size: u64) -> CoreResult<()> {
            let mut data_sets = self.data_sets.lock();
            for data_set in data_sets.iter_mut() {
                if data_set.code == code {
                    data_set.size = Some(size);
                }
            }
            Ok(())
        }

        fn list_archived_containers(&self) -> CoreResult<Vec<String>> {
            Ok(Vec::new())
        }

        fn list_archived_data_sets(&self) -> CoreResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn data_set(code: &str, share_id: &str, size: Option<u64>) -> DataSet {
        DataSet {
            code: code.to_string(),
            size,
            share_id: share_id.to_string(),
            location: format!("uuid/01/{code}"),
            space: "s1".to_string(),
            project: "p1".to_string(),
            experiment: "e1".to_string(),
            sample: None,
            type_code: "dt1".to_string(),
            access_timestamp: 0,
        }
    }

    #[test]
    fn share_dirs_are_all_digit_subdirectories_sorted() {
        let temp = tempdir().unwrap();
        for name in ["2", "1", "blabla", "error", "10"] {
            fs::create_dir(temp.path().join(name)).unwrap();
        }
        fs::write(temp.path().join("3"), b"a file, not a share").unwrap();

        let shares = list_share_dirs(temp.path()).unwrap();
        let ids: Vec<_> = shares.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["1", "10", "2"]);
    }

    #[test]
    fn missing_store_root_is_a_configuration_failure() {
        let temp = tempdir().unwrap();
        let err = list_share_dirs(&temp.path().join("gone")).unwrap_err();
        assert!(matches!(err, CoreError::Configuration { .. }));
    }

    #[test]
    fn load_shares_orders_data_sets_descending_by_size() {
        let temp = tempdir().unwrap();
        fs::create_dir(temp.path().join("1")).unwrap();
        let provider = TableProvider::new(vec![
            data_set("ds-1", "1", Some(10)),
            data_set("ds-2", "1", Some(42)),
        ]);
        let config = StoreConfig::new(temp.path()).incoming_share("1");

        let shares = load_shares(&config, &ConstProbe(12_345), &provider).unwrap();
        assert_eq!(shares.len(), 1);
        let share = &shares[0];
        assert_eq!(share.id(), "1");
        assert!(share.is_incoming());
        assert!(!share.is_withdrawing());
        assert_eq!(share.free_space(), 12_345);
        let codes: Vec<_> = share.data_sets().iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec!["ds-2", "ds-1"]);
        assert_eq!(share.total_size().unwrap(), 52);
    }

    #[test]
    fn unknown_sizes_are_backfilled_from_disk() {
        let temp = tempdir().unwrap();
        let ds_dir = temp.path().join("1/uuid/01/ds-1");
        fs::create_dir_all(&ds_dir).unwrap();
        fs::write(ds_dir.join("read.me"), b"nice work!").unwrap();
        let provider = TableProvider::new(vec![data_set("ds-1", "1", None)]);
        let config = StoreConfig::new(temp.path());

        let shares = load_shares(&config, &ConstProbe(0), &provider).unwrap();
        assert_eq!(shares[0].data_sets()[0].size, Some(10));
        // The back-filled size is persisted through the provider.
        assert_eq!(provider.data_sets.lock()[0].size, Some(10));
    }

    #[test]
    fn vanished_data_set_is_skipped() {
        let temp = tempdir().unwrap();
        fs::create_dir(temp.path().join("1")).unwrap();
        let provider = TableProvider::new(vec![data_set("ds-5", "1", None)]);
        let config = StoreConfig::new(temp.path());

        let shares = load_shares(&config, &ConstProbe(0), &provider).unwrap();
        assert!(shares[0].is_empty());
    }

    #[test]
    fn reclaimed_bytes_are_credited_to_free_space() {
        let temp = tempdir().unwrap();
        fs::create_dir(temp.path().join("1")).unwrap();
        let provider = TableProvider::new(Vec::new());
        let config = StoreConfig::new(temp.path());

        let mut shares = load_shares(&config, &ConstProbe(100), &provider).unwrap();
        shares[0].note_reclaimed(50);
        assert_eq!(shares[0].free_space(), 150);
    }

    #[test]
    fn committed_bytes_are_debited_from_free_space() {
        let temp = tempdir().unwrap();
        fs::create_dir(temp.path().join("1")).unwrap();
        let provider = TableProvider::new(Vec::new());
        let config = StoreConfig::new(temp.path());

        let mut shares = load_shares(&config, &ConstProbe(100), &provider).unwrap();
        shares[0].note_committed(30);
        assert_eq!(shares[0].free_space(), 70);
        // A debit beyond the probed figure bottoms out at zero.
        shares[0].note_committed(1000);
        assert_eq!(shares[0].free_space(), 0);
    }
}
