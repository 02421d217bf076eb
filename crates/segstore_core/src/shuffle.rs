//! Shuffling control loop.
//!
//! Drains incoming shares that run low on free space and withdrawing
//! shares marked for evacuation. One pass identifies the source shares,
//! computes how many data sets must leave each of them, and drives the
//! mover for the computed quota, best-effort: a failure for one data set
//! is logged and the pass continues with the next one.

use crate::config::StoreConfig;
use crate::dataset::DataSet;
use crate::error::{CoreError, CoreResult};
use crate::finder::ShareFinder;
use crate::notify::Notifier;
use crate::probe::FreeSpaceProbe;
use crate::provider::MetadataProvider;
use crate::relocate::DataSetMover;
use crate::share::{load_shares, Share};

use tracing::{info, warn};

/// One-pass shuffling task.
pub struct ShufflingTask<'a> {
    config: &'a StoreConfig,
    probe: &'a dyn FreeSpaceProbe,
    provider: &'a dyn MetadataProvider,
    finder: &'a dyn ShareFinder,
    mover: &'a dyn DataSetMover,
    notifier: &'a dyn Notifier,
}

impl<'a> ShufflingTask<'a> {
    /// Creates the task with its collaborators.
    #[must_use]
    pub fn new(
        config: &'a StoreConfig,
        probe: &'a dyn FreeSpaceProbe,
        provider: &'a dyn MetadataProvider,
        finder: &'a dyn ShareFinder,
        mover: &'a dyn DataSetMover,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            config,
            probe,
            provider,
            finder,
            mover,
            notifier,
        }
    }

    /// Runs one shuffling pass.
    pub fn run_pass(&self) -> CoreResult<()> {
        let mut shares = load_shares(self.config, self.probe, self.provider)?;
        let source_ids: Vec<String> = shares
            .iter()
            .filter(|s| s.is_incoming() || s.is_withdrawing())
            .map(|s| s.id().to_string())
            .collect();
        info!(
            "Shuffling pass over {} shares, {} of them sources.",
            shares.len(),
            source_ids.len()
        );

        let mut emptied = Vec::new();
        for source_id in source_ids {
            let Some(source_index) = shares.iter().position(|s| s.id() == source_id) else {
                continue;
            };
            let quota = compute_quota(&shares[source_index], self.config.minimum_free_space)?;
            if quota.is_empty() {
                continue;
            }
            info!(
                "{} data sets have to be moved away from share {source_id}.",
                quota.len()
            );
            let was_full_drain = quota.len() == shares[source_index].data_sets().len();
            let mut moved = 0usize;
            for data_set in &quota {
                match self.move_one(data_set, source_index, &mut shares) {
                    Ok(true) => moved += 1,
                    Ok(false) => {}
                    Err(err) => {
                        warn!(
                            "Moving data set {} away from share {source_id} failed: {err}",
                            data_set.code
                        );
                    }
                }
            }
            if was_full_drain && moved == quota.len() && !quota.is_empty() {
                emptied.push(source_id);
            }
        }

        if !emptied.is_empty() {
            self.notifier.notify(
                "Shares emptied by shuffling",
                &format!(
                    "The following shares became empty during shuffling: {}",
                    emptied.join(", ")
                ),
            );
        }
        Ok(())
    }

    /// Moves one data set out of the source share. Returns whether a
    /// move actually happened.
    fn move_one(
        &self,
        data_set: &DataSet,
        source_index: usize,
        shares: &mut [Share],
    ) -> CoreResult<bool> {
        let size = data_set.known_size()?;
        let target_id = {
            let target = self.finder.find_share(data_set, shares)?;
            match target {
                Some(share) if share.id() != data_set.share_id => share.id().to_string(),
                _ => {
                    info!("No share found for data set {}.", data_set.code);
                    return Ok(false);
                }
            }
        };
        self.mover.move_data_set(data_set, &target_id)?;
        shares[source_index].note_reclaimed(size);
        // The probe is not refreshed mid-pass, so the target must be
        // debited or later reserve checks would see stale free space.
        if let Some(target) = shares.iter_mut().find(|s| s.id() == target_id) {
            target.note_committed(size);
        }
        Ok(true)
    }
}

/// Computes the data sets that must leave the given share.
///
/// A withdrawing share must be fully drained. Otherwise the quota is the
/// smallest ascending-by-size prefix whose removal lifts the free space
/// above the configured minimum: each visited data set's size is added to
/// the running estimate before testing. A share that stays below the
/// minimum even when empty cannot satisfy the policy at all.
pub fn compute_quota(share: &Share, minimum_free_space: u64) -> CoreResult<Vec<DataSet>> {
    if share.is_withdrawing() {
        return Ok(share.data_sets().to_vec());
    }
    let mut free_above_minimum =
        i128::from(share.free_space()) - i128::from(minimum_free_space);
    if free_above_minimum > 0 {
        return Ok(Vec::new());
    }
    let mut quota = Vec::new();
    // Data sets are held descending by size; walk them ascending.
    for data_set in share.data_sets().iter().rev() {
        free_above_minimum += i128::from(data_set.known_size()?);
        quota.push(data_set.clone());
        if free_above_minimum > 0 {
            return Ok(quota);
        }
    }
    Err(CoreError::configuration(format!(
        "share '{}' cannot reach {minimum_free_space} bytes of free space even when empty",
        share.id()
    )))
}
