//! Task checkpoints.
//!
//! A checkpoint records the last event id a maintenance task has seen,
//! as a single integer in a plain-text file. It is read at task start
//! and rewritten atomically at task end so that a crash never leaves a
//! half-written checkpoint behind.

use crate::error::{CoreError, CoreResult};

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Persistent last-seen event id of one task.
#[derive(Debug)]
pub struct Checkpoint {
    path: PathBuf,
}

impl Checkpoint {
    /// Creates a checkpoint handle for the given file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads the recorded event id. A missing file means no event has
    /// been seen yet.
    pub fn load(&self) -> CoreResult<u64> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err.into()),
        };
        text.trim().parse().map_err(|_| {
            CoreError::configuration(format!(
                "checkpoint file '{}' does not contain an event id: '{}'",
                self.path.display(),
                text.trim()
            ))
        })
    }

    /// Records the event id.
    ///
    /// Uses write-then-rename for crash safety:
    /// 1. Write to temporary file
    /// 2. Sync temporary file to disk
    /// 3. Rename temporary file over the checkpoint
    pub fn store(&self, event_id: u64) -> CoreResult<()> {
        let temp_path = self.path.with_extension("tmp");
        let mut file = File::create(&temp_path)?;
        writeln!(file, "{event_id}")?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &self.path)?;
        sync_parent_directory(&self.path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn sync_parent_directory(path: &Path) -> CoreResult<()> {
    if let Some(parent) = path.parent() {
        let dir = File::open(parent)?;
        dir.sync_all()?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent_directory(_path: &Path) -> CoreResult<()> {
    // NTFS journaling covers metadata durability.
    Ok(())
}
