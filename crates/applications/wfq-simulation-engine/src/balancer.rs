//! Load balancer run driver
//!
//! Owns one run's registry and drives the pipeline:
//! registry -> weight calculation -> virtual-time scheduling -> execution.
//! A run consumes the balancer, so sites and queues are dropped when it ends.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use wfq_core::{
    Batch, CompletionRecord, RequestDescriptor, Result, SiteDescriptor, SiteShare,
    ValidationError,
};

use crate::registry::SiteRegistry;
use crate::scheduler::VirtualTimeScheduler;
use crate::simulator::ExecutionSimulator;
use crate::weights::WeightCalculator;

/// Result of one scheduling run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Weight table, ascending site id
    pub shares: Vec<SiteShare>,
    /// Completion records in service order
    pub completions: Vec<CompletionRecord>,
    /// Descriptors rejected before scheduling, in input order
    pub rejected: Vec<ValidationError>,
}

/// WFQ load balancer for a single batch
#[derive(Debug, Default)]
pub struct LoadBalancer {
    registry: SiteRegistry,
    rejected: Vec<ValidationError>,
}

impl LoadBalancer {
    pub fn new() -> Self {
        LoadBalancer::default()
    }

    /// Start from an already populated registry
    pub fn with_registry(registry: SiteRegistry) -> Self {
        LoadBalancer {
            registry,
            rejected: Vec::new(),
        }
    }

    /// Register every site, then enqueue every request of the batch
    pub fn from_batch(batch: &Batch) -> Self {
        let (registry, rejected) = SiteRegistry::from_batch(batch);
        LoadBalancer { registry, rejected }
    }

    /// Register a site; a rejection is recorded for the run report
    pub fn add_site(&mut self, descriptor: SiteDescriptor) -> bool {
        let result = self.registry.add_site(descriptor).map(|_| ());
        self.record(result)
    }

    /// Enqueue a request; a rejection is recorded for the run report
    pub fn submit(&mut self, request: RequestDescriptor) -> bool {
        let result = self.registry.enqueue(request).map(|_| ());
        self.record(result)
    }

    fn record(&mut self, result: std::result::Result<(), ValidationError>) -> bool {
        match result {
            Ok(()) => true,
            Err(err) => {
                self.rejected.push(err);
                false
            }
        }
    }

    pub fn registry(&self) -> &SiteRegistry {
        &self.registry
    }

    pub fn rejected(&self) -> &[ValidationError] {
        &self.rejected
    }

    /// Run the whole pipeline over the current snapshot
    ///
    /// # Returns
    /// - `Ok(RunReport)`: completion records plus per-item rejections
    /// - `Err(ScheduleError::ZeroTotalWeight)`: no fair share exists, nothing is scheduled
    pub fn run(mut self) -> Result<RunReport> {
        let weights = match WeightCalculator::calculate(&self.registry) {
            Ok(weights) => weights,
            Err(err) => {
                warn!(
                    "Scheduling aborted: {} ({} requests previously rejected)",
                    err,
                    self.rejected.len()
                );
                return Err(err);
            }
        };

        let shares = WeightCalculator::site_shares(&self.registry, &weights);

        info!(
            "Processing {} requests across {} sites using WFQ",
            self.registry.pending_requests(),
            self.registry.len()
        );

        let schedule = VirtualTimeScheduler::schedule(&mut self.registry, &weights);
        let completions = ExecutionSimulator::execute(&self.registry, &schedule);

        info!(
            "Run complete: {} processed, {} rejected, final actual time {}",
            completions.len(),
            self.rejected.len(),
            completions.last().map_or(0, |c| c.actual_time)
        );

        Ok(RunReport {
            shares,
            completions,
            rejected: self.rejected,
        })
    }

    /// Build a fresh balancer from `batch` and run it
    pub fn process(batch: &Batch) -> Result<RunReport> {
        LoadBalancer::from_batch(batch).run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wfq_core::ScheduleError;

    fn equal_sites(n: u64) -> Vec<SiteDescriptor> {
        (1..=n).map(|i| SiteDescriptor::new(i, i, 50, 50)).collect()
    }

    #[test]
    fn test_equal_capacity_round_robin() {
        // 3 equal sites, 10 requests of cost 25 targeted (i % 3) + 1
        let requests = (1..=10).map(|i| RequestDescriptor::new(i, (i % 3) + 1, 25)).collect();
        let report = LoadBalancer::process(&Batch::new(equal_sites(3), requests)).unwrap();

        assert_eq!(report.completions.len(), 10);
        assert!(report.rejected.is_empty());

        // Clock advances by 50 (each site's processing power) per record
        for (i, record) in report.completions.iter().enumerate() {
            assert_eq!(record.actual_time, 50 * (i as u64 + 1));
        }

        // Rounds of equal virtual time interleave all sites in id order
        let first_round: Vec<u64> = report.completions[..3].iter().map(|c| c.site_id).collect();
        assert_eq!(first_round, vec![1, 2, 3]);
        let first_ids: Vec<u64> = report.completions[..3].iter().map(|c| c.request_id).collect();
        assert_eq!(first_ids, vec![3, 1, 2]);

        for share in &report.shares {
            assert!((share.weight_fraction - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_two_site_weighted_order() {
        let batch = Batch::new(
            vec![
                SiteDescriptor::new(1, 1, 100, 50),
                SiteDescriptor::new(2, 2, 25, 25),
            ],
            vec![
                RequestDescriptor::new(1, 2, 30),
                RequestDescriptor::new(2, 1, 30),
            ],
        );

        let report = LoadBalancer::process(&batch).unwrap();
        let order: Vec<(u64, u64, u64)> = report
            .completions
            .iter()
            .map(|c| (c.request_id, c.site_id, c.actual_time))
            .collect();
        assert_eq!(order, vec![(2, 1, 50), (1, 2, 75)]);
    }

    #[test]
    fn test_unknown_site_isolated() {
        let mut balancer = LoadBalancer::new();
        assert!(balancer.add_site(SiteDescriptor::new(1, 1, 50, 50)));
        assert!(balancer.submit(RequestDescriptor::new(1, 1, 10)));
        assert!(!balancer.submit(RequestDescriptor::new(2, 99, 10)));
        assert!(balancer.submit(RequestDescriptor::new(3, 1, 10)));

        let report = balancer.run().unwrap();
        let ids: Vec<u64> = report.completions.iter().map(|c| c.request_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(
            report.rejected,
            vec![ValidationError::UnknownSiteReference {
                request_id: 2,
                site_id: 99
            }]
        );
    }

    #[test]
    fn test_caller_owned_registry() {
        let mut registry = SiteRegistry::new();
        registry.add_site(SiteDescriptor::new(10, 1, 30, 20)).unwrap();
        registry.add_site(SiteDescriptor::new(4, 1, 30, 20)).unwrap();
        registry.enqueue(RequestDescriptor::new(1, 10, 5)).unwrap();
        registry.enqueue(RequestDescriptor::new(2, 4, 5)).unwrap();

        let balancer = LoadBalancer::with_registry(registry);
        assert_eq!(balancer.registry().pending_requests(), 2);
        assert!(balancer.rejected().is_empty());

        // Equal weights tie; the lower site id is served first
        let report = balancer.run().unwrap();
        let order: Vec<(u64, u64)> = report
            .completions
            .iter()
            .map(|c| (c.site_id, c.actual_time))
            .collect();
        assert_eq!(order, vec![(4, 20), (10, 40)]);
    }

    #[test]
    fn test_zero_total_weight_aborts_run() {
        let batch = Batch::new(
            vec![SiteDescriptor::new(1, 1, 0, 0), SiteDescriptor::new(2, 2, 0, 0)],
            vec![RequestDescriptor::new(1, 1, 10)],
        );
        let err = LoadBalancer::process(&batch).unwrap_err();
        assert_eq!(err, ScheduleError::ZeroTotalWeight { sites: 2 });
    }

    #[test]
    fn test_no_sites_is_empty_result() {
        let report = LoadBalancer::process(&Batch::default()).unwrap();
        assert!(report.completions.is_empty());
        assert!(report.rejected.is_empty());
        assert!(report.shares.is_empty());
    }

    #[test]
    fn test_deterministic_across_runs() {
        let sites = vec![
            SiteDescriptor::new(5, 1, 17, 80),
            SiteDescriptor::new(2, 1, 133, 4),
            SiteDescriptor::new(9, 2, 60, 60),
        ];
        let requests = (1..=40)
            .map(|i| {
                let target = [5, 2, 9][(i % 3) as usize];
                RequestDescriptor::new(i, target, (i as i64 * 7) % 23 + 1)
            })
            .collect();
        let batch = Batch::new(sites, requests);

        let first = LoadBalancer::process(&batch).unwrap();
        let second = LoadBalancer::process(&batch).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first.completions).unwrap(),
            serde_json::to_string(&second.completions).unwrap()
        );
    }

    #[test]
    fn test_actual_time_deltas_match_site_power() {
        let sites = vec![
            SiteDescriptor::new(1, 1, 10, 3),
            SiteDescriptor::new(2, 1, 1, 40),
            SiteDescriptor::new(3, 1, 90, 9),
        ];
        let requests = (1..=15)
            .map(|i| RequestDescriptor::new(i, (i % 3) + 1, (i as i64 % 5) + 1))
            .collect();
        let batch = Batch::new(sites.clone(), requests);
        let report = LoadBalancer::process(&batch).unwrap();

        let power = |site_id: u64| {
            sites
                .iter()
                .find(|s| s.id == site_id)
                .map(|s| s.processing_power)
                .unwrap()
        };

        let mut previous = 0;
        for record in &report.completions {
            assert_eq!(record.actual_time - previous, power(record.site_id));
            previous = record.actual_time;
        }
    }
}
