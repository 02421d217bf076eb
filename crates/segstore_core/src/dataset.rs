//! Data set records.
//!
//! A data set is the unit of storage, relocation and archiving: an opaque
//! directory somewhere below a share, identified by its code. All records
//! are loaded fresh from the metadata provider on every pass; nothing here
//! survives across invocations.

use crate::error::{CoreError, CoreResult};

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
pub type TimestampMillis = u64;

/// A stored data set as reported by the metadata provider.
///
/// The size may be unknown when the provider has never measured the data
/// set. It is back-filled during share loading and immutable afterwards;
/// any size-based decision on an unknown size is a hard error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSet {
    /// Opaque identifier, unique store-wide.
    pub code: String,
    /// Size in bytes, if known.
    pub size: Option<u64>,
    /// Id of the share currently holding the data set.
    pub share_id: String,
    /// Location of the data set directory, relative to its share.
    pub location: String,
    /// Organizational space the data set belongs to.
    pub space: String,
    /// Project within the space.
    pub project: String,
    /// Owning experiment.
    pub experiment: String,
    /// Sample the data set was measured on, if any.
    pub sample: Option<String>,
    /// Data set type code.
    pub type_code: String,
    /// Last access timestamp.
    pub access_timestamp: TimestampMillis,
}

impl DataSet {
    /// Returns the known size or an [`CoreError::UnknownSize`] error.
    pub fn known_size(&self) -> CoreResult<u64> {
        self.size.ok_or_else(|| CoreError::unknown_size(&self.code))
    }
}

/// Sums the sizes of the given data sets.
///
/// Fails on the first data set with an unknown size.
pub fn total_size<'a>(data_sets: impl IntoIterator<Item = &'a DataSet>) -> CoreResult<u64> {
    let mut sum = 0u64;
    for data_set in data_sets {
        sum += data_set.known_size()?;
    }
    Ok(sum)
}
