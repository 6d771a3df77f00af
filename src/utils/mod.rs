//! Utility Module Implementation
//!
//! Logging setup and run metrics.

pub mod logger;
pub mod metrics;

pub use logger::Logger;
pub use metrics::{Metrics, MetricsSnapshot};
