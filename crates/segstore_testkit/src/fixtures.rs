//! Store fixtures and collaborator doubles.
//!
//! Provides a temporary segmented store on disk plus in-memory stand-ins
//! for the metadata provider, free-space probe, notifier and mover.

use segstore_core::dataset::DataSet;
use segstore_core::error::{CoreError, CoreResult};
use segstore_core::notify::Notifier;
use segstore_core::probe::FreeSpaceProbe;
use segstore_core::provider::MetadataProvider;
use segstore_core::relocate::DataSetMover;

use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A segmented store on a temporary directory, cleaned up on drop.
pub struct TestStore {
    temp_dir: TempDir,
}

impl TestStore {
    /// Creates an empty store root.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Returns the store root.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Adds an empty share directory.
    #[must_use]
    pub fn with_share(self, share_id: &str) -> Self {
        fs::create_dir_all(self.root().join(share_id)).expect("Failed to create share");
        self
    }

    /// Materializes a data set directory with a single file of the
    /// data set's recorded size.
    #[must_use]
    pub fn with_data_set(self, data_set: &DataSet) -> Self {
        let dir = self
            .root()
            .join(&data_set.share_id)
            .join(&data_set.location);
        fs::create_dir_all(&dir).expect("Failed to create data set directory");
        let size = data_set.size.unwrap_or(0) as usize;
        fs::write(dir.join("payload.dat"), vec![0x5au8; size])
            .expect("Failed to write data set payload");
        self
    }

    /// Path of a data set directory inside the store.
    pub fn data_set_dir(&self, data_set: &DataSet) -> PathBuf {
        self.root()
            .join(&data_set.share_id)
            .join(&data_set.location)
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory metadata provider.
#[derive(Default)]
pub struct MemoryProvider {
    data_sets: Mutex<Vec<DataSet>>,
    archived_containers: Mutex<Vec<String>>,
    archived_data_sets: Mutex<Vec<String>>,
}

impl MemoryProvider {
    /// Creates a provider preloaded with the given data sets.
    pub fn with_data_sets(data_sets: Vec<DataSet>) -> Self {
        Self {
            data_sets: Mutex::new(data_sets),
            ..Self::default()
        }
    }

    /// Registers an archived container name.
    pub fn add_archived_container(&self, name: &str) {
        self.archived_containers.lock().push(name.to_string());
    }

    /// Registers an archived data set code.
    pub fn add_archived_data_set(&self, code: &str) {
        self.archived_data_sets.lock().push(code.to_string());
    }

    /// Snapshot of the current data set records.
    pub fn snapshot(&self) -> Vec<DataSet> {
        self.data_sets.lock().clone()
    }

    /// Returns the record for a code, if present.
    pub fn find(&self, code: &str) -> Option<DataSet> {
        self.data_sets.lock().iter().find(|d| d.code == code).cloned()
    }
}

impl MetadataProvider for MemoryProvider {
    fn list_data_sets(&self) -> CoreResult<Vec<DataSet>> {
        Ok(self.data_sets.lock().clone())
    }

    fn update_share_and_size(&self, code: &str, share_id: &str, size: u64) -> CoreResult<()> {
        for data_set in self.data_sets.lock().iter_mut() {
            if data_set.code == code {
                data_set.share_id = share_id.to_string();
                data_set.size = Some(size);
            }
        }
        Ok(())
    }

    fn set_size(&self, code: &str, size: u64) -> CoreResult<()> {
        for data_set in self.data_sets.lock().iter_mut() {
            if data_set.code == code {
                data_set.size = Some(size);
            }
        }
        Ok(())
    }

    fn list_archived_containers(&self) -> CoreResult<Vec<String>> {
        Ok(self.archived_containers.lock().clone())
    }

    fn list_archived_data_sets(&self) -> CoreResult<Vec<String>> {
        Ok(self.archived_data_sets.lock().clone())
    }
}

/// Probe returning a fixed free-space figure for every path.
pub struct ConstProbe(
    /// The figure to report, in bytes.
    pub u64,
);

impl FreeSpaceProbe for ConstProbe {
    fn free_space_bytes(&self, _path: &Path) -> CoreResult<u64> {
        Ok(self.0)
    }
}

/// Probe failing with an environment error for every path.
pub struct FailingProbe;

impl FreeSpaceProbe for FailingProbe {
    fn free_space_bytes(&self, path: &Path) -> CoreResult<u64> {
        Err(CoreError::environment(format!(
            "cannot determine free space of '{}': probe offline",
            path.display()
        )))
    }
}

/// Notifier that records every message.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    /// All notifications sent so far, as (subject, body) pairs.
    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, subject: &str, body: &str) {
        self.messages
            .lock()
            .push((subject.to_string(), body.to_string()));
    }
}

/// Mover that records requested moves instead of touching the disk.
#[derive(Default)]
pub struct RecordingMover {
    moves: Mutex<Vec<(String, String)>>,
    fail_codes: Mutex<Vec<String>>,
}

impl RecordingMover {
    /// Makes moves of the given data set code fail.
    pub fn fail_for(&self, code: &str) {
        self.fail_codes.lock().push(code.to_string());
    }

    /// All recorded moves, as (code, target share) pairs.
    pub fn moves(&self) -> Vec<(String, String)> {
        self.moves.lock().clone()
    }
}

impl DataSetMover for RecordingMover {
    fn move_data_set(&self, data_set: &DataSet, to_share_id: &str) -> CoreResult<()> {
        if self.fail_codes.lock().contains(&data_set.code) {
            return Err(CoreError::relocation(&data_set.code, "injected failure"));
        }
        self.moves
            .lock()
            .push((data_set.code.clone(), to_share_id.to_string()));
        Ok(())
    }
}

/// Writes a JSON inventory file in the format the command-line tool
/// reads its metadata from.
pub fn write_inventory(
    path: &Path,
    data_sets: &[DataSet],
    archived_containers: &[String],
    archived_data_sets: &[String],
) {
    let inventory = serde_json::json!({
        "data_sets": data_sets,
        "archived_containers": archived_containers,
        "archived_data_sets": archived_data_sets,
    });
    fs::write(path, serde_json::to_string_pretty(&inventory).expect("serialize inventory"))
        .expect("Failed to write inventory file");
}
