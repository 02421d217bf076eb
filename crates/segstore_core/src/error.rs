//! Error types for the segstore engine.

use std::io;
use thiserror::Error;

/// Result type for engine operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while balancing or grouping a segmented store.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A required option is missing or invalid. Fatal at task setup,
    /// before any relocation is attempted.
    #[error("configuration failure: {message}")]
    Configuration {
        /// Description of the invalid configuration.
        message: String,
    },

    /// The environment does not match the metadata (missing share
    /// directory, unreadable store root, probe failure). Aborts the
    /// current pass.
    #[error("environment failure: {message}")]
    Environment {
        /// Description of the failure.
        message: String,
    },

    /// A single relocation failed. Recovered locally by the control
    /// loops: logged, the data set is skipped, the pass continues.
    #[error("relocation of data set '{code}' failed: {message}")]
    Relocation {
        /// Code of the data set that could not be moved.
        code: String,
        /// Description of the failure.
        message: String,
    },

    /// A size-based decision was requested for a data set whose size is
    /// not known. Never silently treated as zero.
    #[error("unknown size of data set '{code}'")]
    UnknownSize {
        /// Code of the data set without a size.
        code: String,
    },

    /// A moved file does not match the checksum recorded for its source.
    #[error("checksum mismatch for '{path}': expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Path of the mismatching file, relative to the data set root.
        path: String,
        /// Checksum recorded for the source file.
        expected: u32,
        /// Checksum computed for the destination file.
        actual: u32,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CoreError {
    /// Creates a configuration failure.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an environment failure.
    pub fn environment(message: impl Into<String>) -> Self {
        Self::Environment {
            message: message.into(),
        }
    }

    /// Creates a relocation failure for the given data set code.
    pub fn relocation(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Relocation {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates an unknown-size error for the given data set code.
    pub fn unknown_size(code: impl Into<String>) -> Self {
        Self::UnknownSize { code: code.into() }
    }
}
