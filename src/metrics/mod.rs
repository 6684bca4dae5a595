//! Metrics module for Prometheus-based monitoring.
//!
//! Tracks job lifecycle events, execution time, queue depth and worker
//! occupancy.
//!
//! # Example
//!
//! ```ignore
//! use spoolq::metrics::{init_metrics, export_metrics, MetricsCollector};
//!
//! // Initialize metrics on startup
//! init_metrics().expect("Failed to initialize metrics");
//!
//! let collector = MetricsCollector::new();
//! collector.record_job_event("completed");
//!
//! // Export metrics in Prometheus text format
//! let metrics_text = export_metrics();
//! ```

pub mod collectors;
pub mod prometheus;

pub use collectors::MetricsCollector;
pub use prometheus::{export_metrics, init_metrics, write_metrics_file};

pub use prometheus::{ACTIVE_WORKERS, JOBS_TOTAL, JOB_DURATION, LIVE_WORKERS, QUEUE_DEPTH, REGISTRY};
