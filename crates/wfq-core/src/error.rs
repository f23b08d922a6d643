//! Error types for the WFQ load balancer

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{RequestId, SiteId};

/// Result type for scheduling runs
pub type Result<T> = std::result::Result<T, ScheduleError>;

/// Per-item rejection: the offending descriptor is dropped, the run continues
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ValidationError {
    #[error("Request {request_id} targets unknown site {site_id}")]
    UnknownSiteReference { request_id: RequestId, site_id: SiteId },

    #[error("Request {request_id} has non-positive processing time {processing_time}")]
    NonPositiveProcessingTime {
        request_id: RequestId,
        processing_time: i64,
    },

    #[error("Request {request_id} processing time {processing_time} exceeds the limit of {max}")]
    ProcessingTimeTooLarge {
        request_id: RequestId,
        processing_time: i64,
        max: u64,
    },

    /// A zero-weight site has no defined virtual-time contribution
    #[error("Request {request_id} targets site {site_id} with zero capacity weight")]
    ZeroCapacitySite { request_id: RequestId, site_id: SiteId },

    #[error("Site {site_id} is already registered")]
    DuplicateSiteId { site_id: SiteId },

    #[error("Site id must be positive (owner {owner_id})")]
    InvalidSiteId { owner_id: u64 },
}

impl ValidationError {
    /// Request the error refers to, if it is a request-level rejection
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            ValidationError::UnknownSiteReference { request_id, .. }
            | ValidationError::NonPositiveProcessingTime { request_id, .. }
            | ValidationError::ProcessingTimeTooLarge { request_id, .. }
            | ValidationError::ZeroCapacitySite { request_id, .. } => Some(*request_id),
            ValidationError::DuplicateSiteId { .. } | ValidationError::InvalidSiteId { .. } => {
                None
            }
        }
    }
}

/// Run-level failure: no completion records are produced
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Total capacity weight across {sites} sites is zero; no fair share exists")]
    ZeroTotalWeight { sites: usize },
}
