//! Input directory scanner and startup recovery.
//!
//! The scanner polls the input directory on a fixed interval, claims each
//! job file by renaming it into the processing directory, and publishes the
//! id to the work queue. Polling is deliberate: it behaves the same on every
//! filesystem and needs no watch state to survive a crash.
//!
//! Recovery runs once before the scanner and any worker start. It re-enqueues
//! every job left in the processing directory by an unclean shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::metrics::MetricsCollector;

use super::job::{JobId, JobLocation};
use super::queue::WorkQueue;
use super::spool::{Spool, SpoolError};

/// Outcome of one pass over the input directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Jobs moved to processing and enqueued.
    pub claimed: Vec<JobId>,
    /// Jobs whose claim failed; they stay in input for the next pass.
    pub skipped: Vec<JobId>,
}

/// Outcome of the startup recovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Jobs found in processing and re-enqueued.
    pub recovered: Vec<JobId>,
    /// Jobs found in processing that already had a result in output. Their
    /// stale processing copy is removed and they are not re-run.
    pub already_completed: Vec<JobId>,
}

/// Re-enqueues jobs orphaned in the processing directory.
///
/// Must run before the scanner and the workers start. Jobs are not moved:
/// they are already claimed. A job that also has an output file crashed
/// between writing its result and removing its processing copy, so it is
/// treated as done rather than executed a second time.
pub async fn recover(
    spool: &Spool,
    queue: &WorkQueue,
    metrics: &MetricsCollector,
) -> Result<RecoveryReport, SpoolError> {
    let mut report = RecoveryReport::default();

    for id in spool.list(JobLocation::Processing).await? {
        if spool.contains(JobLocation::Output, &id).await {
            info!(job_id = %id, "Job already has a result, dropping stale processing copy");
            if let Err(e) = spool.remove(JobLocation::Processing, &id).await {
                warn!(job_id = %id, error = %e, "Failed to remove stale processing copy");
            }
            report.already_completed.push(id);
            continue;
        }

        info!(job_id = %id, "Recovered job from processing directory");
        queue.enqueue(id.clone());
        metrics.record_job_event("recovered");
        report.recovered.push(id);
    }

    metrics.set_queue_depth(queue.len());
    Ok(report)
}

/// Polls the input directory and hands claimed jobs to the work queue.
pub struct Scanner {
    spool: Arc<Spool>,
    queue: Arc<WorkQueue>,
    interval: Duration,
    metrics: MetricsCollector,
}

impl Scanner {
    /// Creates a scanner that polls `spool`'s input directory every
    /// `interval`.
    pub fn new(
        spool: Arc<Spool>,
        queue: Arc<WorkQueue>,
        interval: Duration,
        metrics: MetricsCollector,
    ) -> Self {
        Self {
            spool,
            queue,
            interval,
            metrics,
        }
    }

    /// Runs until `shutdown` is cancelled.
    ///
    /// Listing failures are logged and retried after the next interval; they
    /// never stop the loop.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            input_dir = %self.spool.input_dir().display(),
            interval_ms = self.interval.as_millis() as u64,
            "Scanner started"
        );

        while !shutdown.is_cancelled() {
            if let Err(e) = self.scan_once().await {
                warn!(error = %e, "Failed to scan input directory");
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.cancelled() => {}
            }
        }

        info!("Scanner stopped");
    }

    /// Performs a single pass over the input directory.
    ///
    /// Each job is claimed independently: a failed rename (the file vanished,
    /// another process claimed it, a transient error) skips that job only.
    /// Skipped jobs are not enqueued and are retried on the next pass if they
    /// are still in input.
    pub async fn scan_once(&self) -> Result<ScanReport, SpoolError> {
        let mut report = ScanReport::default();

        for id in self.spool.list(JobLocation::Input).await? {
            match self.spool.claim(&id).await {
                Ok(()) => {
                    info!(job_id = %id, "Detected new job, moved to processing");
                    self.queue.enqueue(id.clone());
                    self.metrics.record_job_event("claimed");
                    report.claimed.push(id);
                }
                Err(e) => {
                    warn!(job_id = %id, error = %e, "Failed to claim job");
                    report.skipped.push(id);
                }
            }
        }

        if !report.claimed.is_empty() {
            debug!(claimed = report.claimed.len(), "Scan complete");
        }
        self.metrics.set_queue_depth(self.queue.len());

        Ok(report)
    }
}
