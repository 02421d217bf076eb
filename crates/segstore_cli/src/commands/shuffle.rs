//! Shuffle command implementation.

use crate::error::CliError;
use crate::inventory::JsonFileProvider;
use crate::run_config::RunConfig;

use segstore_core::finder::finder_registry;
use segstore_core::lock::LockManager;
use segstore_core::notify::LogNotifier;
use segstore_core::probe::OsFreeSpaceProbe;
use segstore_core::relocate::StoreMover;
use segstore_core::shuffle::ShufflingTask;

/// Runs one shuffling pass.
pub fn run(config: &RunConfig) -> Result<(), CliError> {
    config.store.validate()?;
    let registry = finder_registry();
    let factory = registry
        .get(config.finder.as_str())
        .ok_or_else(|| CliError::UnknownStrategy(config.finder.clone()))?;
    let finder = factory(config.store.minimum_free_space);

    let provider = JsonFileProvider::open(&config.inventory)?;
    let locks = LockManager::new();
    let mover = StoreMover::new(
        &config.store.store_root,
        &provider,
        &locks,
        config.verify_checksums,
    );
    let notifier = LogNotifier;

    super::with_checkpoint(&config.store, "shuffle", || {
        ShufflingTask::new(
            &config.store,
            &OsFreeSpaceProbe,
            &provider,
            finder.as_ref(),
            &mover,
            &notifier,
        )
        .run_pass()
        .map_err(CliError::Core)
    })
}
