//! The relocation primitive.
//!
//! Moves one data set's files from its current share to another share
//! under the same relative location, holding the data set's exclusive
//! lock for the whole operation. The move is transactional in effect:
//! the source is only deleted after the destination copy has been
//! verified and the metadata updated. A failed copy or verification
//! leaves the data set attributed to, and recoverable from, its original
//! share.

use crate::checksum::{file_crc32, ChecksumMap};
use crate::dataset::DataSet;
use crate::error::{CoreError, CoreResult};
use crate::lock::LockManager;
use crate::provider::MetadataProvider;

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Moves a data set to the given share.
///
/// When a checksum map is supplied, every copied file must match it
/// before the metadata is touched. Returns without effect when the data
/// set already lives in the destination share; a vanished source
/// directory is reported and skipped.
pub fn relocate(
    store_root: &Path,
    data_set: &DataSet,
    to_share_id: &str,
    checksums: Option<&ChecksumMap>,
    provider: &dyn MetadataProvider,
    locks: &LockManager,
) -> CoreResult<()> {
    let _guard = locks.lock(&data_set.code);

    let source = store_root.join(&data_set.share_id).join(&data_set.location);
    if !source.exists() {
        warn!(
            "Data set '{}' no longer exists in the data store.",
            data_set.code
        );
        return Ok(());
    }
    if data_set.share_id == to_share_id {
        return Ok(());
    }

    let destination = store_root.join(to_share_id).join(&data_set.location);
    info!(
        "Start moving directory '{}' to new share '{}'",
        source.display(),
        destination.display()
    );
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    let moved = copy_and_verify(data_set, &source, &destination, checksums);
    let size = match moved {
        Ok(size) => size,
        Err(err) => {
            // Roll the partial copy back; the source stays authoritative.
            if destination.exists() {
                let _ = fs::remove_dir_all(&destination);
            }
            return Err(CoreError::relocation(&data_set.code, err.to_string()));
        }
    };
    info!(
        "Finished moving directory '{}' to new share '{}'",
        source.display(),
        destination.display()
    );

    provider.update_share_and_size(&data_set.code, to_share_id, size)?;

    info!(
        "Start deleting data set {} at {}",
        data_set.code,
        source.display()
    );
    fs::remove_dir_all(&source)?;
    info!(
        "Data set {} at {} has been successfully deleted.",
        data_set.code,
        source.display()
    );
    Ok(())
}

fn copy_and_verify(
    data_set: &DataSet,
    source: &Path,
    destination: &Path,
    checksums: Option<&ChecksumMap>,
) -> CoreResult<u64> {
    copy_dir(source, destination)?;
    info!(
        "Verifying structure, size and optional checksum of data set {} content.",
        data_set.code
    );
    verify_copy(source, destination, source, checksums)
}

fn copy_dir(source: &Path, destination: &Path) -> CoreResult<()> {
    fs::create_dir_all(destination)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let from = entry.path();
        let to = destination.join(entry.file_name());
        if from.is_dir() {
            copy_dir(&from, &to)?;
        } else {
            fs::copy(&from, &to)?;
        }
    }
    Ok(())
}

/// Compares source and destination trees and returns the summed file
/// size. Checksums, when supplied, are keyed by `/`-separated path
/// relative to the data set root.
fn verify_copy(
    source: &Path,
    destination: &Path,
    source_root: &Path,
    checksums: Option<&ChecksumMap>,
) -> CoreResult<u64> {
    if source.is_dir() {
        if !destination.is_dir() {
            return Err(CoreError::environment(format!(
                "destination directory does not exist: '{}'",
                destination.display()
            )));
        }
        let source_children = sorted_children(source)?;
        let destination_children = sorted_children(destination)?;
        if source_children.len() != destination_children.len() {
            return Err(CoreError::environment(format!(
                "destination directory '{}' has {} files but source directory '{}' has {} files",
                destination.display(),
                destination_children.len(),
                source.display(),
                source_children.len()
            )));
        }
        let mut sum = 0u64;
        for (src, dst) in source_children.iter().zip(&destination_children) {
            if src.file_name() != dst.file_name() {
                return Err(CoreError::environment(format!(
                    "destination file '{}' has a different name than source file '{}'",
                    dst.display(),
                    src.display()
                )));
            }
            sum += verify_copy(src, dst, source_root, checksums)?;
        }
        Ok(sum)
    } else {
        if !destination.is_file() {
            return Err(CoreError::environment(format!(
                "destination file does not exist: '{}'",
                destination.display()
            )));
        }
        let source_size = fs::metadata(source)?.len();
        let destination_size = fs::metadata(destination)?.len();
        if source_size != destination_size {
            return Err(CoreError::environment(format!(
                "destination file '{}' has size {destination_size} but source file '{}' has size {source_size}",
                destination.display(),
                source.display()
            )));
        }
        if let Some(checksums) = checksums {
            let relative = relative_slash_path(source_root, source);
            if let Some(&expected) = checksums.get(&relative) {
                let actual = file_crc32(destination)?;
                if actual != expected {
                    return Err(CoreError::ChecksumMismatch {
                        path: relative,
                        expected,
                        actual,
                    });
                }
            }
        }
        Ok(source_size)
    }
}

fn sorted_children(dir: &Path) -> CoreResult<Vec<PathBuf>> {
    let mut children: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()?;
    children.sort();
    Ok(children)
}

fn relative_slash_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Moves data sets between shares on behalf of the control loops.
///
/// The loops treat the mover as an external collaborator: a failure for
/// one data set is logged and the loop proceeds with the next one.
pub trait DataSetMover {
    /// Moves one data set to the given share.
    fn move_data_set(&self, data_set: &DataSet, to_share_id: &str) -> CoreResult<()>;
}

/// Mover backed by the [`relocate`] primitive.
pub struct StoreMover<'a> {
    store_root: PathBuf,
    provider: &'a dyn MetadataProvider,
    locks: &'a LockManager,
    verify_checksums: bool,
}

impl<'a> StoreMover<'a> {
    /// Creates a mover for the given store.
    #[must_use]
    pub fn new(
        store_root: impl Into<PathBuf>,
        provider: &'a dyn MetadataProvider,
        locks: &'a LockManager,
        verify_checksums: bool,
    ) -> Self {
        Self {
            store_root: store_root.into(),
            provider,
            locks,
            verify_checksums,
        }
    }
}

impl DataSetMover for StoreMover<'_> {
    fn move_data_set(&self, data_set: &DataSet, to_share_id: &str) -> CoreResult<()> {
        let checksums = if self.verify_checksums {
            let source = self
                .store_root
                .join(&data_set.share_id)
                .join(&data_set.location);
            if source.exists() {
                Some(crate::checksum::directory_checksums(&source)?)
            } else {
                None
            }
        } else {
            None
        };
        relocate(
            &self.store_root,
            data_set,
            to_share_id,
            checksums.as_ref(),
            self.provider,
            self.locks,
        )
    }
}
