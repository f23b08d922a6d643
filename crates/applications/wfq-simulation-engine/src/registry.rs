//! Site registry
//!
//! Caller-owned collection of sites keyed by id, each holding a FIFO queue of
//! validated requests. Every boundary check on descriptors happens here, so the
//! scheduler only ever sees requests that reference a registered, weighted site.

use std::collections::BTreeMap;

use tracing::{debug, warn};
use wfq_core::{
    Batch, MAX_REQUEST_PROCESSING_TIME, QueuedRequest, RequestDescriptor, Site, SiteDescriptor,
    SiteId, ValidationError,
};

/// Sites of one scheduling run, keyed by id
///
/// Iteration is always in ascending site id, independent of registration order.
#[derive(Debug, Clone, Default)]
pub struct SiteRegistry {
    sites: BTreeMap<SiteId, Site>,
    next_sequence: u64,
}

impl SiteRegistry {
    pub fn new() -> Self {
        SiteRegistry::default()
    }

    /// Build a registry from a batch, registering all sites before any request
    ///
    /// # Returns
    /// The populated registry and every per-item rejection, in input order
    /// (site rejections first, then request rejections).
    pub fn from_batch(batch: &Batch) -> (Self, Vec<ValidationError>) {
        let mut registry = SiteRegistry::new();
        let mut rejected = Vec::new();

        for descriptor in &batch.sites {
            if let Err(err) = registry.add_site(*descriptor) {
                rejected.push(err);
            }
        }

        for request in &batch.requests {
            if let Err(err) = registry.enqueue(*request) {
                rejected.push(err);
            }
        }

        (registry, rejected)
    }

    /// Register a new site
    ///
    /// Id `0` and ids already present are rejected; the registry is left unchanged.
    pub fn add_site(&mut self, descriptor: SiteDescriptor) -> Result<SiteId, ValidationError> {
        if descriptor.id == 0 {
            let err = ValidationError::InvalidSiteId {
                owner_id: descriptor.owner_id,
            };
            warn!("Rejected site: {}", err);
            return Err(err);
        }

        if self.sites.contains_key(&descriptor.id) {
            let err = ValidationError::DuplicateSiteId {
                site_id: descriptor.id,
            };
            warn!("Rejected site: {}", err);
            return Err(err);
        }

        let site = Site::new(descriptor);
        debug!(
            "Site {} registered (owner {}, bandwidth {}, processing power {}, weight {})",
            site.id, site.owner_id, site.bandwidth, site.processing_power, site.capacity_weight
        );
        self.sites.insert(site.id, site);

        Ok(descriptor.id)
    }

    /// Append a request to its target site's queue
    ///
    /// Checks, in order: the target site exists, the processing time is
    /// positive and at most `MAX_REQUEST_PROCESSING_TIME`, the target site has
    /// non-zero capacity weight.
    ///
    /// # Returns
    /// The run-wide enqueue sequence number assigned to the request
    pub fn enqueue(&mut self, request: RequestDescriptor) -> Result<u64, ValidationError> {
        let result = self.try_enqueue(request);
        if let Err(err) = &result {
            warn!("Rejected request: {}", err);
        }
        result
    }

    fn try_enqueue(&mut self, request: RequestDescriptor) -> Result<u64, ValidationError> {
        let site = self.sites.get_mut(&request.target_site_id).ok_or(
            ValidationError::UnknownSiteReference {
                request_id: request.request_id,
                site_id: request.target_site_id,
            },
        )?;

        let processing_time = u64::try_from(request.processing_time)
            .ok()
            .filter(|&t| t > 0)
            .ok_or(ValidationError::NonPositiveProcessingTime {
                request_id: request.request_id,
                processing_time: request.processing_time,
            })?;

        if processing_time > MAX_REQUEST_PROCESSING_TIME {
            return Err(ValidationError::ProcessingTimeTooLarge {
                request_id: request.request_id,
                processing_time: request.processing_time,
                max: MAX_REQUEST_PROCESSING_TIME,
            });
        }

        if site.capacity_weight == 0 {
            return Err(ValidationError::ZeroCapacitySite {
                request_id: request.request_id,
                site_id: site.id,
            });
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        site.push_request(QueuedRequest {
            request_id: request.request_id,
            processing_time,
            sequence,
        });

        debug!(
            "Request {} added to site {} (weight {}) with processing time {}",
            request.request_id, site.id, site.capacity_weight, processing_time
        );

        Ok(sequence)
    }

    pub fn get(&self, site_id: SiteId) -> Option<&Site> {
        self.sites.get(&site_id)
    }

    /// Sites in ascending id order
    pub fn sites(&self) -> impl Iterator<Item = &Site> {
        self.sites.values()
    }

    pub(crate) fn sites_mut(&mut self) -> impl Iterator<Item = &mut Site> {
        self.sites.values_mut()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Total number of requests waiting across all sites
    pub fn pending_requests(&self) -> usize {
        self.sites.values().map(Site::queue_len).sum()
    }
}
