//! Balancing strategies.
//!
//! A balancer looks at the loaded shares and decides what, if anything,
//! to move. The default strategy never moves: it reports occupancy so an
//! operator can judge whether shuffling settings need adjustment.
//! Strategies are pluggable through the same lookup-table mechanism as
//! share finders.

use crate::error::CoreResult;
use crate::relocate::DataSetMover;
use crate::share::Share;

use std::collections::HashMap;
use tracing::info;

/// Decides and performs rebalancing moves over the loaded shares.
pub trait Balancer {
    /// Runs one balancing pass.
    fn balance(&self, shares: &mut [Share], mover: &dyn DataSetMover) -> CoreResult<()>;
}

/// Reporting-only balancer: logs per-share occupancy and the largest
/// data sets, performs no moves.
#[derive(Debug, Clone, Copy)]
pub struct CapacitySummaryBalancer {
    /// How many of the largest data sets to list per share.
    top: usize,
}

impl CapacitySummaryBalancer {
    /// Creates a summary balancer listing the `top` largest data sets.
    #[must_use]
    pub const fn new(top: usize) -> Self {
        Self { top }
    }
}

impl Default for CapacitySummaryBalancer {
    fn default() -> Self {
        Self::new(3)
    }
}

impl Balancer for CapacitySummaryBalancer {
    fn balance(&self, shares: &mut [Share], _mover: &dyn DataSetMover) -> CoreResult<()> {
        for share in shares.iter() {
            let total = share.total_size()?;
            info!(
                "Share {} has {} data sets using {total} bytes, {} bytes free.",
                share.id(),
                share.data_sets().len(),
                share.free_space()
            );
            // Data sets are already ordered descending by size.
            for data_set in share.data_sets().iter().take(self.top) {
                info!("   {}: {} bytes", data_set.code, data_set.known_size()?);
            }
        }
        Ok(())
    }
}

/// Constructor function for a named balancing strategy.
pub type BalancerFactory = fn() -> Box<dyn Balancer>;

/// Lookup table mapping configuration names to balancer constructors.
#[must_use]
pub fn balancer_registry() -> HashMap<&'static str, BalancerFactory> {
    let mut registry: HashMap<&'static str, BalancerFactory> = HashMap::new();
    registry.insert("capacity-summary", || {
        Box::new(CapacitySummaryBalancer::default())
    });
    registry
}
