//! Orphans command implementation.

use crate::error::CliError;
use crate::inventory::JsonFileProvider;
use crate::run_config::RunConfig;

use segstore_core::error::CoreError;
use segstore_core::notify::LogNotifier;
use segstore_core::orphan::OrphanReconciler;

/// Reconciles the archive directory against the metadata.
pub fn run(config: &RunConfig) -> Result<(), CliError> {
    let archive_dir = config.store.archive_dir.as_ref().ok_or_else(|| {
        CliError::Core(CoreError::configuration(
            "archive_dir is required for orphan reconciliation",
        ))
    })?;
    let provider = JsonFileProvider::open(&config.inventory)?;
    let notifier = LogNotifier;

    super::with_checkpoint(&config.store, "orphans", || {
        let report = OrphanReconciler::new(archive_dir, &provider, &notifier).run()?;
        if report.is_clean() {
            println!("Archive and metadata are consistent.");
        } else {
            println!(
                "Found {} unknown files, {} missing containers, {} missing data sets.",
                report.unknown_files.len(),
                report.missing_containers.len(),
                report.missing_data_sets.len()
            );
        }
        Ok(())
    })
}
