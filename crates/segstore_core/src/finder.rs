//! Share-finder strategies.
//!
//! A share finder is a pure choice function: given a data set and the
//! candidate shares, pick the target share for a move, or none when
//! moving brings no benefit. Strategies are pluggable; configuration
//! selects one by name through an explicit lookup table.

use crate::dataset::DataSet;
use crate::error::CoreResult;
use crate::share::Share;

use std::collections::HashMap;

/// Decides whether a share is usable for a particular data set at all,
/// before free space is considered (e.g. cross-host transfer speed).
pub trait FeasibilityCheck: Send + Sync {
    /// Whether the data set may be placed on the share.
    fn is_feasible(&self, data_set: &DataSet, share: &Share) -> bool;
}

/// Accepts every share.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysFeasible;

impl FeasibilityCheck for AlwaysFeasible {
    fn is_feasible(&self, _data_set: &DataSet, _share: &Share) -> bool {
        true
    }
}

/// Picks a target share for a data set.
pub trait ShareFinder {
    /// Returns the target share, or `None` when the data set should stay
    /// where it is.
    fn find_share<'a>(&self, data_set: &DataSet, shares: &'a [Share])
        -> CoreResult<Option<&'a Share>>;
}

/// Default strategy: the feasible share with the most free space.
///
/// Returns `None` when the data set's home share already has the most
/// free space, or when the move would leave less than the configured
/// reserve on the destination. Candidates are scanned in slice order and
/// compared with a strict `>`, so the first share with the maximal free
/// space wins; `load_shares` orders shares by id, which makes the
/// tie-break deterministic.
pub struct MaxFreeSpaceFinder {
    minimum_free_space: u64,
    feasibility: Box<dyn FeasibilityCheck>,
}

impl MaxFreeSpaceFinder {
    /// Creates a finder honoring the given free-space reserve.
    #[must_use]
    pub fn new(minimum_free_space: u64) -> Self {
        Self {
            minimum_free_space,
            feasibility: Box::new(AlwaysFeasible),
        }
    }

    /// Replaces the feasibility check.
    #[must_use]
    pub fn with_feasibility(mut self, feasibility: Box<dyn FeasibilityCheck>) -> Self {
        self.feasibility = feasibility;
        self
    }
}

impl ShareFinder for MaxFreeSpaceFinder {
    fn find_share<'a>(
        &self,
        data_set: &DataSet,
        shares: &'a [Share],
    ) -> CoreResult<Option<&'a Share>> {
        let size = data_set.known_size()?;
        let mut best: Option<&Share> = None;
        let mut home: Option<&Share> = None;
        for share in shares {
            if share.id() == data_set.share_id {
                home = Some(share);
            }
            if !self.feasibility.is_feasible(data_set, share) {
                continue;
            }
            if best.is_none_or(|b| share.free_space() > b.free_space()) {
                best = Some(share);
            }
        }
        let Some(best) = best else { return Ok(None) };
        if let Some(home) = home {
            // No benefit in moving when home is already the roomiest.
            if home.free_space() >= best.free_space() {
                return Ok(None);
            }
        }
        if best.free_space() < size || best.free_space() - size <= self.minimum_free_space {
            return Ok(None);
        }
        Ok(Some(best))
    }
}

/// Constructor function for a named share-finder strategy.
pub type ShareFinderFactory = fn(minimum_free_space: u64) -> Box<dyn ShareFinder>;

/// Lookup table mapping configuration names to finder constructors.
#[must_use]
pub fn finder_registry() -> HashMap<&'static str, ShareFinderFactory> {
    let mut registry: HashMap<&'static str, ShareFinderFactory> = HashMap::new();
    registry.insert("max-free-space", |reserve| {
        Box::new(MaxFreeSpaceFinder::new(reserve))
    });
    registry
}
