//! WFQ Core - Shared types and errors
//!
//! This crate defines the data model used by the scheduler pipeline:
//! - Site and request descriptors (caller input)
//! - Sites with FIFO request queues
//! - Scheduled tasks and completion records (pipeline output)
//! - Per-item and run-level error types

pub mod types;
pub mod error;

pub use types::*;
pub use error::*;
