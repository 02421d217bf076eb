//! Balance command implementation.

use crate::error::CliError;
use crate::inventory::JsonFileProvider;
use crate::run_config::RunConfig;

use segstore_core::balance::balancer_registry;
use segstore_core::lock::LockManager;
use segstore_core::probe::OsFreeSpaceProbe;
use segstore_core::relocate::StoreMover;
use segstore_core::share::load_shares;

/// Runs one balancing pass.
pub fn run(config: &RunConfig) -> Result<(), CliError> {
    config.store.validate()?;
    let registry = balancer_registry();
    let factory = registry
        .get(config.balancer.as_str())
        .ok_or_else(|| CliError::UnknownStrategy(config.balancer.clone()))?;
    let balancer = factory();

    let provider = JsonFileProvider::open(&config.inventory)?;
    let locks = LockManager::new();
    let mover = StoreMover::new(
        &config.store.store_root,
        &provider,
        &locks,
        config.verify_checksums,
    );

    super::with_checkpoint(&config.store, "balance", || {
        let mut shares = load_shares(&config.store, &OsFreeSpaceProbe, &provider)?;
        balancer.balance(&mut shares, &mover).map_err(CliError::Core)
    })
}
