//! WFQ Simulation Engine
//!
//! Weighted Fair Queuing load balancer over a batch of requests spread across
//! weighted sites. The pipeline runs as one deterministic pass:
//! registry -> weights -> virtual-time scheduler -> execution simulator.

pub mod registry;
pub mod weights;
pub mod scheduler;
pub mod simulator;
pub mod balancer;
pub mod scenarios;
pub mod report;

pub use balancer::{LoadBalancer, RunReport};
pub use registry::SiteRegistry;
