//! Weight calculation
//!
//! Each site's fair share is its capacity weight (bandwidth + processing power)
//! normalized by the total capacity weight of every registered site.

use std::collections::BTreeMap;

use tracing::info;
use wfq_core::{Result, ScheduleError, SiteId, SiteShare};

use crate::registry::SiteRegistry;

/// Normalized weight fractions for one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightTable {
    fractions: BTreeMap<SiteId, f64>,
    total_weight: u128,
}

impl WeightTable {
    /// Weight fraction of a site, `None` if the site was not in the snapshot
    pub fn fraction(&self, site_id: SiteId) -> Option<f64> {
        self.fractions.get(&site_id).copied()
    }

    /// Sum of capacity weights the fractions were normalized by
    pub fn total_weight(&self) -> u128 {
        self.total_weight
    }

    /// `(site_id, weight_fraction)` in ascending site id order
    pub fn iter(&self) -> impl Iterator<Item = (SiteId, f64)> + '_ {
        self.fractions.iter().map(|(&id, &fraction)| (id, fraction))
    }
}

/// Derives fair-share weights from site capacities
pub struct WeightCalculator;

impl WeightCalculator {
    /// Compute the weight fraction of every registered site
    ///
    /// # Returns
    /// - An empty table when no sites are registered
    /// - `ScheduleError::ZeroTotalWeight` when sites exist but all have zero capacity
    pub fn calculate(registry: &SiteRegistry) -> Result<WeightTable> {
        if registry.is_empty() {
            return Ok(WeightTable::default());
        }

        let total_weight: u128 = registry
            .sites()
            .map(|site| site.capacity_weight)
            .sum();

        if total_weight == 0 {
            return Err(ScheduleError::ZeroTotalWeight {
                sites: registry.len(),
            });
        }

        let fractions = registry
            .sites()
            .map(|site| (site.id, site.capacity_weight as f64 / total_weight as f64))
            .collect();

        Ok(WeightTable {
            fractions,
            total_weight,
        })
    }

    /// Per-site weight table joined with the capacity attributes it came from
    pub fn site_shares(registry: &SiteRegistry, weights: &WeightTable) -> Vec<SiteShare> {
        let shares: Vec<SiteShare> = weights
            .iter()
            .filter_map(|(site_id, weight_fraction)| {
                registry.get(site_id).map(|site| SiteShare {
                    site_id,
                    bandwidth: site.bandwidth,
                    processing_power: site.processing_power,
                    capacity_weight: site.capacity_weight,
                    weight_fraction,
                })
            })
            .collect();

        info!(
            "Total capacity weight {} across {} sites",
            weights.total_weight(),
            shares.len()
        );

        for share in &shares {
            info!(
                "Site {} (bandwidth {}, processing power {}, total weight {}) share {:.4}",
                share.site_id,
                share.bandwidth,
                share.processing_power,
                share.capacity_weight,
                share.weight_fraction
            );
        }

        shares
    }
}
