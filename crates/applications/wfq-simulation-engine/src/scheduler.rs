//! Virtual-time scheduler (Weighted Fair Queuing)
//!
//! Every site keeps its own virtual clock. Draining a site's FIFO queue advances
//! that clock by `processing_time / weight_fraction` per request, so heavier sites
//! accumulate virtual time more slowly and win the global merge more often.
//!
//! The merge sorts all tagged requests by virtual finish time, breaking ties by
//! site id and then by enqueue sequence.

use tracing::{debug, warn};
use wfq_core::{ScheduledTask, Site};

use crate::registry::SiteRegistry;
use crate::weights::WeightTable;

/// Turns per-site FIFO queues into one globally ordered task sequence
pub struct VirtualTimeScheduler;

impl VirtualTimeScheduler {
    /// Drain one site's queue, tagging each request with its virtual finish time
    ///
    /// # Arguments
    /// - `site`: Site whose queue is drained (left empty afterwards)
    /// - `weight_fraction`: The site's normalized weight, must be positive
    ///
    /// # Returns
    /// Tasks in FIFO order with strictly increasing virtual finish times
    pub fn expand_site(site: &mut Site, weight_fraction: f64) -> Vec<ScheduledTask> {
        let site_id = site.id;
        let mut virtual_time = 0.0;

        site.drain_requests()
            .map(|request| {
                let next = virtual_time + request.processing_time as f64 / weight_fraction;
                // Increments below f64 resolution still advance the clock
                virtual_time = if next > virtual_time {
                    next
                } else {
                    next_representable(virtual_time)
                };
                ScheduledTask {
                    virtual_finish_time: virtual_time,
                    request_id: request.request_id,
                    site_id,
                    sequence: request.sequence,
                }
            })
            .collect()
    }

    /// Sort tasks into global service order
    pub fn merge(mut tasks: Vec<ScheduledTask>) -> Vec<ScheduledTask> {
        tasks.sort();
        tasks
    }

    /// Drain every site in the registry and merge the result
    pub fn schedule(registry: &mut SiteRegistry, weights: &WeightTable) -> Vec<ScheduledTask> {
        let mut tasks = Vec::with_capacity(registry.pending_requests());

        for site in registry.sites_mut() {
            if site.queue_len() == 0 {
                continue;
            }

            // Registry admission keeps zero-weight sites empty
            let Some(weight_fraction) = weights.fraction(site.id).filter(|&w| w > 0.0) else {
                warn!(
                    "Site {} has {} queued requests but no usable weight; leaving them queued",
                    site.id,
                    site.queue_len()
                );
                continue;
            };

            tasks.extend(Self::expand_site(site, weight_fraction));
        }

        let schedule = Self::merge(tasks);
        for task in &schedule {
            debug!(
                "Request {} on site {} virtual finish time {:.3}",
                task.request_id, task.site_id, task.virtual_finish_time
            );
        }

        schedule
    }
}

/// Smallest `f64` above a non-negative finite value
fn next_representable(value: f64) -> f64 {
    f64::from_bits(value.to_bits() + 1)
}
