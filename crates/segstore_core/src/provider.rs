//! Metadata provider contract.

use crate::dataset::DataSet;
use crate::error::CoreResult;

/// Access to the authoritative data set metadata.
///
/// The real implementation talks to the metadata database; tests use an
/// in-memory table. The engine never caches provider results across
/// passes.
pub trait MetadataProvider {
    /// Lists all physical data sets known to the store.
    fn list_data_sets(&self) -> CoreResult<Vec<DataSet>>;

    /// Records a new home share and size after a successful relocation.
    fn update_share_and_size(&self, code: &str, share_id: &str, size: u64) -> CoreResult<()>;

    /// Back-fills a freshly measured size for a data set.
    fn set_size(&self, code: &str, size: u64) -> CoreResult<()>;

    /// Lists the names of archive containers recorded in the database.
    fn list_archived_containers(&self) -> CoreResult<Vec<String>>;

    /// Lists the codes of single data sets recorded as archived.
    fn list_archived_data_sets(&self) -> CoreResult<Vec<String>>;
}
