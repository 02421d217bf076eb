//! Free-space probing.

use crate::error::{CoreError, CoreResult};

use std::path::Path;

/// Queries the free space available below a path.
///
/// The engine reads one probe result per share and pass; probe failures
/// are environment failures that abort the pass, so that free-space
/// accounting is never silently wrong.
pub trait FreeSpaceProbe {
    /// Returns the free space in bytes for the filesystem holding `path`.
    fn free_space_bytes(&self, path: &Path) -> CoreResult<u64>;
}

/// Probe backed by the operating system's filesystem statistics.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFreeSpaceProbe;

impl FreeSpaceProbe for OsFreeSpaceProbe {
    fn free_space_bytes(&self, path: &Path) -> CoreResult<u64> {
        fs2::available_space(path).map_err(|err| {
            CoreError::environment(format!(
                "cannot determine free space of '{}': {err}",
                path.display()
            ))
        })
    }
}
