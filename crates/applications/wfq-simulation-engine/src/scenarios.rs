//! Synthetic scenario generation and batch loading
//!
//! Generators are seeded, so a given `ScenarioConfig` always yields the same batch.
//! Sites are numbered `1..=num_sites` with `owner_id = id`; request `i` (1-based)
//! targets site `(i % num_sites) + 1`.

use std::fs;
use std::path::Path;

use clap::ValueEnum;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use wfq_core::{Batch, RequestDescriptor, SiteDescriptor, SiteId};

/// Bandwidth and processing power used when an attribute is not varied
pub const BASELINE_CAPACITY: u64 = 50;

/// Processing time of every request in the non-stress scenarios
pub const BASELINE_PROCESSING_TIME: i64 = 25;

/// Inclusive bound for random bandwidth
pub const MAX_BANDWIDTH: u64 = 200;

/// Inclusive bound for random processing power
pub const MAX_PROCESSING_POWER: u64 = 100;

/// Inclusive bound for random processing time in the stress test
pub const MAX_PROCESSING_TIME: i64 = 50;

/// Errors produced while building a batch
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Manual scenario requires an input batch file")]
    MissingInput,
}

/// Which batch to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioKind {
    /// Every site has bandwidth 50 and processing power 50
    Equal,
    /// Random bandwidth in 1..=200, processing power 50
    VariedBandwidth,
    /// Bandwidth 50, random processing power in 1..=100
    VariedPower,
    /// Random bandwidth, processing power and processing time
    Stress,
    /// Batch read from a JSON file
    Manual,
}

/// Size and seed of a synthetic scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub num_sites: u64,
    pub num_requests: u64,
    pub seed: u64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        ScenarioConfig {
            num_sites: 3,
            num_requests: 10,
            seed: 43,
        }
    }
}

/// Seeded generator for synthetic batches
pub struct ScenarioGenerator {
    config: ScenarioConfig,
    rng: StdRng,
}

impl ScenarioGenerator {
    pub fn new(config: ScenarioConfig) -> Self {
        ScenarioGenerator {
            config,
            rng: StdRng::seed_from_u64(config.seed),
        }
    }

    /// Build a batch for a synthetic scenario
    ///
    /// `ScenarioKind::Manual` has no synthetic form; use [`load_batch`] instead.
    pub fn generate(&mut self, kind: ScenarioKind) -> Result<Batch, ScenarioError> {
        let batch = match kind {
            ScenarioKind::Equal => self.equal_capacity(),
            ScenarioKind::VariedBandwidth => self.varied_bandwidth(),
            ScenarioKind::VariedPower => self.varied_processing_power(),
            ScenarioKind::Stress => self.stress_test(),
            ScenarioKind::Manual => return Err(ScenarioError::MissingInput),
        };

        info!(
            "Generated {:?} scenario: {} sites, {} requests (seed {})",
            kind,
            batch.sites.len(),
            batch.requests.len(),
            self.config.seed
        );

        Ok(batch)
    }

    /// Identical sites, identical requests
    pub fn equal_capacity(&mut self) -> Batch {
        let sites = self.sites(|_| (BASELINE_CAPACITY, BASELINE_CAPACITY));
        let requests = self.requests(|_| BASELINE_PROCESSING_TIME);
        Batch::new(sites, requests)
    }

    pub fn varied_bandwidth(&mut self) -> Batch {
        let bandwidth = Uniform::new_inclusive(1, MAX_BANDWIDTH);
        let sites = self.sites(|rng| (bandwidth.sample(rng), BASELINE_CAPACITY));
        let requests = self.requests(|_| BASELINE_PROCESSING_TIME);
        Batch::new(sites, requests)
    }

    pub fn varied_processing_power(&mut self) -> Batch {
        let power = Uniform::new_inclusive(1, MAX_PROCESSING_POWER);
        let sites = self.sites(|rng| (BASELINE_CAPACITY, power.sample(rng)));
        let requests = self.requests(|_| BASELINE_PROCESSING_TIME);
        Batch::new(sites, requests)
    }

    /// Everything random: site capacities and request costs
    pub fn stress_test(&mut self) -> Batch {
        let bandwidth = Uniform::new_inclusive(1, MAX_BANDWIDTH);
        let power = Uniform::new_inclusive(1, MAX_PROCESSING_POWER);
        let processing_time = Uniform::new_inclusive(1, MAX_PROCESSING_TIME);

        let sites = self.sites(|rng| {
            let b = bandwidth.sample(rng);
            (b, power.sample(rng))
        });
        let requests = self.requests(|rng| processing_time.sample(rng));
        Batch::new(sites, requests)
    }

    fn sites(
        &mut self,
        mut capacity: impl FnMut(&mut StdRng) -> (u64, u64),
    ) -> Vec<SiteDescriptor> {
        (1..=self.config.num_sites)
            .map(|id| {
                let (bandwidth, processing_power) = capacity(&mut self.rng);
                SiteDescriptor::new(id, id, bandwidth, processing_power)
            })
            .collect()
    }

    fn requests(
        &mut self,
        mut processing_time: impl FnMut(&mut StdRng) -> i64,
    ) -> Vec<RequestDescriptor> {
        (1..=self.config.num_requests)
            .map(|i| {
                let target = round_robin_target(i, self.config.num_sites);
                RequestDescriptor::new(i, target, processing_time(&mut self.rng))
            })
            .collect()
    }
}

/// Target site for request `i`; with no sites every request points at site 1,
/// which then fails registry validation as an unknown site
fn round_robin_target(i: u64, num_sites: u64) -> SiteId {
    if num_sites == 0 { 1 } else { (i % num_sites) + 1 }
}

/// Read a batch of site and request descriptors from a JSON file
pub fn load_batch(path: impl AsRef<Path>) -> Result<Batch, ScenarioError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let batch: Batch = serde_json::from_str(&contents)?;

    info!(
        "Loaded batch from {}: {} sites, {} requests",
        path.display(),
        batch.sites.len(),
        batch.requests.len()
    );

    Ok(batch)
}
