//! Core types shared across the WFQ load balancer

use std::cmp::Ordering;
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Unique identifier for a site (positive)
pub type SiteId = u64;

/// Identifier for a request, unique within a run
pub type RequestId = u64;

/// Opaque owner identifier, carried but never used for scheduling
pub type OwnerId = u64;

/// Largest accepted request processing time (2^53)
///
/// Every integer up to this bound is exact in an `f64` virtual clock.
pub const MAX_REQUEST_PROCESSING_TIME: u64 = 1 << 53;

/// Site as supplied by the caller, before registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteDescriptor {
    pub id: SiteId,
    pub owner_id: OwnerId,
    pub bandwidth: u64,
    pub processing_power: u64,
}

impl SiteDescriptor {
    pub fn new(id: SiteId, owner_id: OwnerId, bandwidth: u64, processing_power: u64) -> Self {
        SiteDescriptor {
            id,
            owner_id,
            bandwidth,
            processing_power,
        }
    }

    /// Capacity weight = bandwidth + processing power
    ///
    /// Widened to `u128` so the sum of two `u64` attributes is exact.
    pub fn capacity_weight(&self) -> u128 {
        u128::from(self.bandwidth) + u128::from(self.processing_power)
    }
}

/// Request as supplied by the caller
///
/// `processing_time` is signed so that non-positive costs reach validation
/// instead of being unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub request_id: RequestId,
    pub target_site_id: SiteId,
    pub processing_time: i64,
}

impl RequestDescriptor {
    pub fn new(request_id: RequestId, target_site_id: SiteId, processing_time: i64) -> Self {
        RequestDescriptor {
            request_id,
            target_site_id,
            processing_time,
        }
    }
}

/// A validated request waiting in a site's FIFO queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedRequest {
    pub request_id: RequestId,
    pub processing_time: u64,
    /// Run-wide enqueue order, assigned by the registry
    pub sequence: u64,
}

/// A weighted resource with its own FIFO request queue
#[derive(Debug, Clone)]
pub struct Site {
    pub id: SiteId,
    pub owner_id: OwnerId,
    pub bandwidth: u64,
    pub processing_power: u64,
    pub capacity_weight: u128,
    queue: VecDeque<QueuedRequest>,
}

impl Site {
    pub fn new(descriptor: SiteDescriptor) -> Self {
        Site {
            id: descriptor.id,
            owner_id: descriptor.owner_id,
            bandwidth: descriptor.bandwidth,
            processing_power: descriptor.processing_power,
            capacity_weight: descriptor.capacity_weight(),
            queue: VecDeque::new(),
        }
    }

    /// Append a request to the back of the queue
    pub fn push_request(&mut self, request: QueuedRequest) {
        self.queue.push_back(request);
    }

    /// Remove every queued request, oldest first
    pub fn drain_requests(&mut self) -> impl Iterator<Item = QueuedRequest> + '_ {
        self.queue.drain(..)
    }

    /// Requests currently waiting, oldest first
    pub fn queued(&self) -> impl Iterator<Item = &QueuedRequest> {
        self.queue.iter()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }
}

/// A request tagged with its virtual finish time
#[derive(Debug, Clone, Copy)]
pub struct ScheduledTask {
    pub virtual_finish_time: f64,
    pub request_id: RequestId,
    pub site_id: SiteId,
    pub sequence: u64,
}

// Service order: virtual finish time, then site id, then enqueue sequence.
// `total_cmp` keeps the order total even for values that compare unequal
// under IEEE rules.
impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> Ordering {
        self.virtual_finish_time
            .total_cmp(&other.virtual_finish_time)
            .then_with(|| self.site_id.cmp(&other.site_id))
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for ScheduledTask {}

impl PartialEq for ScheduledTask {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

/// Final output unit: which site served a request, and when
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub request_id: RequestId,
    pub site_id: SiteId,
    pub actual_time: u64,
}

/// A site's share of total capacity for one run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteShare {
    pub site_id: SiteId,
    pub bandwidth: u64,
    pub processing_power: u64,
    pub capacity_weight: u128,
    pub weight_fraction: f64,
}

/// Everything one run consumes: site and request descriptors in input order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub sites: Vec<SiteDescriptor>,
    pub requests: Vec<RequestDescriptor>,
}

impl Batch {
    pub fn new(sites: Vec<SiteDescriptor>, requests: Vec<RequestDescriptor>) -> Self {
        Batch { sites, requests }
    }
}
