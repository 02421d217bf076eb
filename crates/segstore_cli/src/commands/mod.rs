//! CLI command implementations.

pub mod balance;
pub mod group;
pub mod orphans;
pub mod shuffle;

use crate::error::CliError;
use segstore_core::checkpoint::Checkpoint;
use segstore_core::StoreConfig;

use tracing::info;

/// Runs one task pass between checkpoint load and store.
///
/// The checkpoint counts completed passes of the task. Without a
/// configured checkpoint directory the pass just runs.
fn with_checkpoint(
    store: &StoreConfig,
    task: &str,
    run: impl FnOnce() -> Result<(), CliError>,
) -> Result<(), CliError> {
    let checkpoint = store
        .checkpoint_dir
        .as_ref()
        .map(|dir| Checkpoint::new(dir.join(format!("{task}.checkpoint"))));
    let pass = match &checkpoint {
        Some(checkpoint) => checkpoint.load().map_err(CliError::Core)?,
        None => 0,
    };
    info!("Starting {task} pass {}.", pass + 1);
    run()?;
    if let Some(checkpoint) = &checkpoint {
        checkpoint.store(pass + 1).map_err(CliError::Core)?;
    }
    Ok(())
}
