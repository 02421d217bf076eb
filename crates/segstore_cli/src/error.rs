//! CLI error type.

use segstore_core::CoreError;
use std::path::Path;
use thiserror::Error;

/// Errors surfaced to the command line.
#[derive(Debug, Error)]
pub enum CliError {
    /// Engine failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A configuration or inventory file could not be read.
    #[error("cannot read '{path}': {source}")]
    Read {
        /// Offending file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration or inventory file does not parse.
    #[error("'{path}' is not valid JSON: {source}")]
    Parse {
        /// Offending file.
        path: String,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// A strategy name has no entry in the registry.
    #[error("unknown strategy '{0}'")]
    UnknownStrategy(String),
}

impl CliError {
    pub(crate) fn read(path: &Path, source: std::io::Error) -> Self {
        Self::Read {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn parse(path: &Path, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.display().to_string(),
            source,
        }
    }
}
