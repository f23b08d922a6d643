//! Execution simulator
//!
//! Walks the globally ordered schedule and stamps each request with a simulated
//! completion time. One clock is shared by the whole run. Each serviced request
//! advances it by the serving site's processing power, independent of the
//! request's own cost: every request occupies a slice of its site's capacity.

use tracing::{debug, warn};
use wfq_core::{CompletionRecord, ScheduledTask};

use crate::registry::SiteRegistry;

/// Produces completion records from a merged schedule
pub struct ExecutionSimulator;

impl ExecutionSimulator {
    /// Simulate processing of `schedule` in order
    ///
    /// Sites are looked up by id, never by position.
    ///
    /// # Returns
    /// One record per task, with non-decreasing `actual_time`
    pub fn execute(registry: &SiteRegistry, schedule: &[ScheduledTask]) -> Vec<CompletionRecord> {
        let mut actual_time: u64 = 0;
        let mut completions = Vec::with_capacity(schedule.len());

        for task in schedule {
            let Some(site) = registry.get(task.site_id) else {
                warn!(
                    "Request {} scheduled on unregistered site {}; skipping",
                    task.request_id, task.site_id
                );
                continue;
            };

            actual_time = actual_time.saturating_add(site.processing_power);

            debug!(
                "Processed request {} for site {} at actual time {}",
                task.request_id, task.site_id, actual_time
            );

            completions.push(CompletionRecord {
                request_id: task.request_id,
                site_id: task.site_id,
                actual_time,
            });
        }

        completions
    }
}
