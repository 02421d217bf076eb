//! Group command implementation.

use crate::error::CliError;
use crate::inventory::JsonFileProvider;
use crate::run_config::RunConfig;

use segstore_core::grouping::GroupingEngine;
use segstore_core::notify::LogNotifier;
use segstore_core::probe::OsFreeSpaceProbe;
use segstore_core::share::load_shares;

/// Selects and prints the next archive candidate group.
pub fn run(config: &RunConfig) -> Result<(), CliError> {
    let keys = config.store.validate()?;
    let provider = JsonFileProvider::open(&config.inventory)?;
    let notifier = LogNotifier;

    super::with_checkpoint(&config.store, "group", || {
        // Loading the shares back-fills any unknown sizes first.
        let shares = load_shares(&config.store, &OsFreeSpaceProbe, &provider)?;
        let candidates: Vec<_> = shares
            .iter()
            .flat_map(|share| share.data_sets().iter().cloned())
            .collect();

        let engine = GroupingEngine::new(
            config.store.min_group_size,
            config.store.max_group_size,
            &keys,
            &notifier,
        );
        let selected = engine.filter(&candidates)?;
        if selected.is_empty() {
            println!("No archive candidate group found.");
        } else {
            println!("Archive candidate group ({} data sets):", selected.len());
            for data_set in &selected {
                println!("  {}", data_set.code);
            }
        }
        Ok(())
    })
}
