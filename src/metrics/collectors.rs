//! High-level recording interface over the raw Prometheus metrics.
//!
//! Every method is a no-op until [`init_metrics`](super::init_metrics) has
//! run, so library users and tests that never initialize metrics pay nothing.

use std::time::Duration;

use super::prometheus::{ACTIVE_WORKERS, JOBS_TOTAL, JOB_DURATION, LIVE_WORKERS, QUEUE_DEPTH};

/// Metrics collector for recording spoolq operational metrics.
///
/// # Example
///
/// ```ignore
/// use spoolq::metrics::{init_metrics, MetricsCollector};
///
/// init_metrics().expect("Failed to init metrics");
/// let collector = MetricsCollector::new();
///
/// collector.record_job_event("claimed");
/// collector.set_queue_depth(3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector;

impl MetricsCollector {
    pub fn new() -> Self {
        Self
    }

    /// Counts one job lifecycle event.
    ///
    /// `event` is one of `claimed`, `recovered`, `completed`, `failed` or
    /// `skipped`.
    pub fn record_job_event(&self, event: &str) {
        if let Some(jobs_total) = JOBS_TOTAL.get() {
            jobs_total.with_label_values(&[event]).inc();
        }

        tracing::trace!(event = event, "Recorded job event");
    }

    /// Records the execution time of one job.
    pub fn record_job_duration(&self, duration: Duration) {
        if let Some(job_duration) = JOB_DURATION.get() {
            job_duration.observe(duration.as_secs_f64());
        }
    }

    /// Set the current work queue depth.
    pub fn set_queue_depth(&self, depth: usize) {
        if let Some(queue_depth) = QUEUE_DEPTH.get() {
            queue_depth.set(depth as f64);
        }
    }

    /// A worker started executing a job.
    pub fn worker_busy(&self) {
        if let Some(active) = ACTIVE_WORKERS.get() {
            active.inc();
        }
    }

    /// A worker finished executing a job.
    pub fn worker_idle(&self) {
        if let Some(active) = ACTIVE_WORKERS.get() {
            active.dec();
        }
    }

    /// A worker initialized its executor and joined the pool.
    pub fn worker_started(&self) {
        if let Some(live) = LIVE_WORKERS.get() {
            live.inc();
        }
    }

    /// A worker left the pool.
    pub fn worker_stopped(&self) {
        if let Some(live) = LIVE_WORKERS.get() {
            live.dec();
        }
    }
}
