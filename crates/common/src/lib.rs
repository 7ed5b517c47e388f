#![deny(missing_docs)]

//! Shared error types, identifiers, and observability primitives for mapflow crates.
//!
//! Architecture role:
//! - provides the common [`MapFlowError`] / [`Result`] contracts
//! - defines opaque identifier wrappers shared across scheduler components
//! - hosts the metrics registry used by the scheduler control loop
//!
//! Key modules:
//! - [`error`]
//! - [`ids`]
//! - [`metrics`]

/// Shared error taxonomy.
pub mod error;
/// Strongly-typed identifier wrappers.
pub mod ids;
/// Metrics registry and Prometheus rendering helpers.
pub mod metrics;

pub use error::{MapFlowError, Result};
pub use ids::ResultId;
pub use metrics::{MetricsRegistry, global_metrics};
