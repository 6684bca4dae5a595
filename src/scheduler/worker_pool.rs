//! Worker pool and lifecycle controller for the spool.
//!
//! [`WorkerPool`] owns the scanner task and a fixed number of worker tasks.
//! Each worker builds its own executor at startup, then pulls job ids from
//! the shared [`WorkQueue`] and runs them one at a time.
//!
//! # Features
//!
//! - Recovery of jobs orphaned in the processing directory on every start
//! - Per-worker executor, initialized on the blocking thread pool
//! - Graceful shutdown through a cancellation token, draining queued jobs
//! - Failed jobs parked in the failed directory, never retried
//! - Pool statistics tracking

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigError, SpoolConfig};
use crate::executor::{Executor, ExecutorError, ExecutorFactory};
use crate::metrics::MetricsCollector;

use super::job::{JobId, JobLocation, JobStatus};
use super::queue::WorkQueue;
use super::scanner::{recover, Scanner};
use super::spool::{Completion, Spool, SpoolError};

/// Errors that can occur in the worker pool.
///
/// Only launch failures surface here. Per-job and per-worker failures are
/// logged and counted in [`PoolStats`].
#[derive(Debug, Error)]
pub enum PoolError {
    /// The configuration was rejected.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The spool directories could not be prepared.
    #[error("Spool setup failed: {0}")]
    SpoolSetup(#[from] SpoolError),
}

/// Statistics about the worker pool.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Configured number of workers.
    pub num_workers: usize,
    /// Workers whose executor initialized and that are still running.
    pub live_workers: usize,
    /// Number of workers currently executing a job.
    pub active_workers: usize,
    /// Total number of jobs completed successfully.
    pub jobs_completed: u64,
    /// Total number of jobs moved to the failed directory.
    pub jobs_failed: u64,
    /// Dispatches dropped because the processing copy was gone.
    pub jobs_skipped: u64,
    /// Average job execution duration.
    pub average_job_duration: Duration,
    /// Job ids waiting in the work queue.
    pub queue_size: usize,
}

impl PoolStats {
    /// Returns the total number of jobs processed (completed + failed).
    pub fn total_processed(&self) -> u64 {
        self.jobs_completed + self.jobs_failed
    }

    /// Returns the success rate as a percentage.
    pub fn success_rate(&self) -> f64 {
        let total = self.total_processed();
        if total == 0 {
            return 0.0;
        }
        (self.jobs_completed as f64 / total as f64) * 100.0
    }
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "workers {}/{} live, {} busy | queue {} | completed {}, failed {}, skipped {} | avg {:.2}s",
            self.live_workers,
            self.num_workers,
            self.active_workers,
            self.queue_size,
            self.jobs_completed,
            self.jobs_failed,
            self.jobs_skipped,
            self.average_job_duration.as_secs_f64(),
        )
    }
}

/// Shared state for tracking pool statistics.
struct SharedPoolStats {
    jobs_completed: AtomicU64,
    jobs_failed: AtomicU64,
    jobs_skipped: AtomicU64,
    total_duration_ms: AtomicU64,
    active_workers: AtomicU64,
    live_workers: AtomicU64,
}

impl SharedPoolStats {
    fn new() -> Self {
        Self {
            jobs_completed: AtomicU64::new(0),
            jobs_failed: AtomicU64::new(0),
            jobs_skipped: AtomicU64::new(0),
            total_duration_ms: AtomicU64::new(0),
            active_workers: AtomicU64::new(0),
            live_workers: AtomicU64::new(0),
        }
    }

    fn record(&self, status: JobStatus, duration: Duration) {
        let counter = match status {
            JobStatus::Completed => &self.jobs_completed,
            JobStatus::Failed => &self.jobs_failed,
            JobStatus::Skipped => {
                self.jobs_skipped.fetch_add(1, Ordering::SeqCst);
                return;
            }
        };
        counter.fetch_add(1, Ordering::SeqCst);
        self.total_duration_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    fn increment_active(&self) {
        self.active_workers.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement_active(&self) {
        self.active_workers.fetch_sub(1, Ordering::SeqCst);
    }

    fn increment_live(&self) {
        self.live_workers.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement_live(&self) {
        self.live_workers.fetch_sub(1, Ordering::SeqCst);
    }

    fn to_pool_stats(&self, num_workers: usize, queue_size: usize) -> PoolStats {
        let completed = self.jobs_completed.load(Ordering::SeqCst);
        let failed = self.jobs_failed.load(Ordering::SeqCst);
        let total_duration_ms = self.total_duration_ms.load(Ordering::SeqCst);

        let total_jobs = completed + failed;
        let average_duration = if total_jobs > 0 {
            Duration::from_millis(total_duration_ms / total_jobs)
        } else {
            Duration::ZERO
        };

        PoolStats {
            num_workers,
            live_workers: self.live_workers.load(Ordering::SeqCst) as usize,
            active_workers: self.active_workers.load(Ordering::SeqCst) as usize,
            jobs_completed: completed,
            jobs_failed: failed,
            jobs_skipped: self.jobs_skipped.load(Ordering::SeqCst),
            average_job_duration: average_duration,
            queue_size,
        }
    }
}

/// Lifecycle controller for the scanner and the workers.
///
/// Dropping a running pool cancels its tasks without waiting for them;
/// call [`stop`](Self::stop) to wait for in-flight jobs.
pub struct WorkerPool {
    config: SpoolConfig,
    spool: Arc<Spool>,
    queue: Arc<WorkQueue>,
    factory: Arc<dyn ExecutorFactory>,
    stats: Arc<SharedPoolStats>,
    metrics: MetricsCollector,
    shutdown: Option<CancellationToken>,
    scanner_handle: Option<JoinHandle<()>>,
    worker_handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Creates a stopped pool.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Config` if the configuration does not validate.
    pub fn new(config: SpoolConfig, factory: Arc<dyn ExecutorFactory>) -> Result<Self, PoolError> {
        config.validate()?;

        Ok(Self {
            spool: Arc::new(config.spool()),
            config,
            queue: Arc::new(WorkQueue::new()),
            factory,
            stats: Arc::new(SharedPoolStats::new()),
            metrics: MetricsCollector::new(),
            shutdown: None,
            scanner_handle: None,
            worker_handles: Vec::new(),
        })
    }

    /// Recovers orphaned jobs, then launches the scanner and all workers.
    ///
    /// A no-op if the pool is already running. Worker initialization
    /// failures are logged and reduce the pool size; they do not fail the
    /// launch.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::SpoolSetup` if the spool directories cannot be
    /// created.
    pub async fn start(&mut self) -> Result<(), PoolError> {
        if self.is_running() {
            debug!("Worker pool already running");
            return Ok(());
        }

        self.spool.ensure_dirs().await?;

        // Anything still queued from a previous run is also still in
        // processing, so recovery picks it up again.
        let stale = self.queue.drain();
        if !stale.is_empty() {
            debug!(count = stale.len(), "Discarded stale queue entries");
        }

        match recover(&self.spool, &self.queue, &self.metrics).await {
            Ok(report) => {
                if !report.recovered.is_empty() || !report.already_completed.is_empty() {
                    info!(
                        recovered = report.recovered.len(),
                        already_completed = report.already_completed.len(),
                        "Recovered jobs from processing directory"
                    );
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to recover processing jobs");
            }
        }

        let shutdown = CancellationToken::new();

        for i in 0..self.config.num_workers {
            let worker = Worker {
                id: format!("worker-{}", i),
                spool: Arc::clone(&self.spool),
                queue: Arc::clone(&self.queue),
                factory: Arc::clone(&self.factory),
                model_path: self.config.model_path.clone(),
                shutdown: shutdown.clone(),
                stats: Arc::clone(&self.stats),
                metrics: self.metrics.clone(),
            };

            self.worker_handles.push(tokio::spawn(worker.run()));
        }

        let scanner = Scanner::new(
            Arc::clone(&self.spool),
            Arc::clone(&self.queue),
            self.config.scan_interval,
            self.metrics.clone(),
        );
        self.scanner_handle = Some(tokio::spawn(scanner.run(shutdown.clone())));

        self.shutdown = Some(shutdown);
        info!(
            num_workers = self.config.num_workers,
            input_dir = %self.spool.input_dir().display(),
            output_dir = %self.spool.output_dir().display(),
            "Worker pool started"
        );

        Ok(())
    }

    /// Stops the scanner, lets the workers drain the queue, and waits for
    /// every task to exit.
    ///
    /// Safe to call on a stopped pool and safe to call repeatedly.
    pub async fn stop(&mut self) -> Result<(), PoolError> {
        let Some(shutdown) = self.shutdown.take() else {
            debug!("Worker pool not running");
            return Ok(());
        };

        info!("Initiating worker pool shutdown");
        shutdown.cancel();

        if let Some(scanner) = self.scanner_handle.take() {
            if let Err(e) = scanner.await {
                error!(error = %e, "Scanner task panicked during shutdown");
            }
        }

        for result in join_all(self.worker_handles.drain(..)).await {
            if let Err(e) = result {
                error!(error = %e, "Worker task panicked during shutdown");
            }
        }

        self.metrics.set_queue_depth(self.queue.len());
        info!("Worker pool shutdown complete");

        Ok(())
    }

    /// Returns whether the pool is currently running.
    pub fn is_running(&self) -> bool {
        self.shutdown.is_some()
    }

    /// Number of job ids waiting in the work queue.
    pub fn queue_size(&self) -> usize {
        self.queue.len()
    }

    /// Returns current pool statistics.
    pub fn stats(&self) -> PoolStats {
        self.stats
            .to_pool_stats(self.config.num_workers, self.queue.len())
    }

    /// One-line human-readable summary of the pool.
    pub fn status(&self) -> String {
        let state = if self.is_running() { "running" } else { "stopped" };
        format!("{}: {}", state, self.stats())
    }

    /// Returns the spool the pool operates on.
    pub fn spool(&self) -> &Arc<Spool> {
        &self.spool
    }

    /// Returns a reference to the work queue.
    pub fn queue(&self) -> &Arc<WorkQueue> {
        &self.queue
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if let Some(shutdown) = &self.shutdown {
            warn!("Worker pool dropped while running; tasks will finish detached");
            shutdown.cancel();
        }
    }
}

/// A single worker that processes jobs from the queue.
struct Worker {
    id: String,
    spool: Arc<Spool>,
    queue: Arc<WorkQueue>,
    factory: Arc<dyn ExecutorFactory>,
    model_path: PathBuf,
    shutdown: CancellationToken,
    stats: Arc<SharedPoolStats>,
    metrics: MetricsCollector,
}

impl Worker {
    /// Main worker loop.
    ///
    /// Builds the executor, then processes jobs until the queue is empty and
    /// shutdown has been requested. An executor lost to a panic is rebuilt;
    /// the worker exits early only if the executor cannot be built.
    async fn run(self) {
        let Some(mut executor) = self.init_executor().await else {
            return;
        };

        self.stats.increment_live();
        self.metrics.worker_started();
        info!(worker_id = %self.id, "Worker started");

        while let Some(job_id) = self.queue.dequeue(&self.shutdown).await {
            self.metrics.set_queue_depth(self.queue.len());

            executor = match self.process_job(executor, job_id).await {
                Some(returned) => returned,
                None => {
                    warn!(worker_id = %self.id, "Executor lost after a panic, rebuilding");
                    match self.init_executor().await {
                        Some(rebuilt) => rebuilt,
                        None => break,
                    }
                }
            };
        }

        self.stats.decrement_live();
        self.metrics.worker_stopped();
        info!(worker_id = %self.id, "Worker stopped");
    }

    async fn init_executor(&self) -> Option<Box<dyn Executor>> {
        let factory = Arc::clone(&self.factory);
        let model_path = self.model_path.clone();

        match tokio::task::spawn_blocking(move || factory.create(&model_path)).await {
            Ok(Ok(executor)) => Some(executor),
            Ok(Err(e)) => {
                error!(
                    worker_id = %self.id,
                    error = %e,
                    "Executor initialization failed, worker exiting"
                );
                None
            }
            Err(e) => {
                error!(
                    worker_id = %self.id,
                    error = %e,
                    "Executor initialization panicked, worker exiting"
                );
                None
            }
        }
    }

    /// Processes a single job and hands the executor back, or `None` if the
    /// executor panicked and has to be rebuilt.
    async fn process_job(
        &self,
        executor: Box<dyn Executor>,
        job_id: JobId,
    ) -> Option<Box<dyn Executor>> {
        if !self.spool.contains(JobLocation::Processing, &job_id).await {
            warn!(
                worker_id = %self.id,
                job_id = %job_id,
                "Job file missing from processing directory, skipping"
            );
            self.record(JobStatus::Skipped, Duration::ZERO);
            return Some(executor);
        }

        let payload = match self.spool.read_payload(&job_id).await {
            Ok(payload) => payload,
            Err(e) => {
                error!(
                    worker_id = %self.id,
                    job_id = %job_id,
                    error = %e,
                    "Failed to read job payload"
                );
                self.fail_job(&job_id, Duration::ZERO).await;
                return Some(executor);
            }
        };

        info!(
            worker_id = %self.id,
            job_id = %job_id,
            bytes = payload.len(),
            "Processing job"
        );

        self.stats.increment_active();
        self.metrics.worker_busy();
        let start_time = Instant::now();

        let joined = tokio::task::spawn_blocking(move || {
            let mut executor = executor;
            let result = executor.execute(&payload);
            (executor, result)
        })
        .await;

        let duration = start_time.elapsed();
        self.stats.decrement_active();
        self.metrics.worker_idle();
        self.metrics.record_job_duration(duration);

        let (executor, result) = match joined {
            Ok((executor, result)) => (Some(executor), result),
            Err(e) => (None, Err(ExecutorError::Panicked(e.to_string()))),
        };

        match result {
            Ok(output) => self.finish_job(&job_id, &output, duration).await,
            Err(e) => {
                warn!(
                    worker_id = %self.id,
                    job_id = %job_id,
                    error = %e,
                    "Job failed, moving to failed directory"
                );
                self.fail_job(&job_id, duration).await;
            }
        }

        executor
    }

    async fn finish_job(&self, job_id: &JobId, output: &str, duration: Duration) {
        match self.spool.complete(job_id, output).await {
            Ok(Completion::Clean) => {}
            Ok(Completion::CleanupFailed(e)) => {
                warn!(
                    worker_id = %self.id,
                    job_id = %job_id,
                    error = %e,
                    "Result written but processing copy could not be removed"
                );
            }
            Err(e) => {
                error!(
                    worker_id = %self.id,
                    job_id = %job_id,
                    error = %e,
                    "Failed to write job result"
                );
                self.fail_job(job_id, duration).await;
                return;
            }
        }

        self.record(JobStatus::Completed, duration);
        info!(
            worker_id = %self.id,
            job_id = %job_id,
            duration_ms = duration.as_millis() as u64,
            "Job completed successfully"
        );
    }

    async fn fail_job(&self, job_id: &JobId, duration: Duration) {
        if let Err(e) = self.spool.fail(job_id).await {
            error!(
                worker_id = %self.id,
                job_id = %job_id,
                error = %e,
                "Failed to move job to failed directory"
            );
        }
        self.record(JobStatus::Failed, duration);
    }

    fn record(&self, status: JobStatus, duration: Duration) {
        self.stats.record(status, duration);
        self.metrics.record_job_event(&status.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn upper_factory() -> Arc<dyn ExecutorFactory> {
        Arc::new(|_model: &std::path::Path| -> Result<Box<dyn Executor>, ExecutorError> {
            Ok(Box::new(|input: &str| -> Result<String, ExecutorError> {
                Ok(input.to_uppercase())
            }))
        })
    }

    fn test_config(temp: &TempDir) -> SpoolConfig {
        SpoolConfig::new("test-model")
            .with_input_dir(temp.path().join("input"))
            .with_output_dir(temp.path().join("output"))
            .with_scan_interval(Duration::from_millis(20))
    }

    async fn wait_for(mut check: impl FnMut() -> bool) {
        for _ in 0..250 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("condition not met in time");
    }

    #[test]
    fn test_pool_stats_default() {
        let stats = PoolStats::default();

        assert_eq!(stats.num_workers, 0);
        assert_eq!(stats.live_workers, 0);
        assert_eq!(stats.active_workers, 0);
        assert_eq!(stats.jobs_completed, 0);
        assert_eq!(stats.jobs_failed, 0);
        assert_eq!(stats.jobs_skipped, 0);
        assert_eq!(stats.average_job_duration, Duration::ZERO);
        assert_eq!(stats.total_processed(), 0);
        assert!((stats.success_rate() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pool_stats_calculations() {
        let stats = PoolStats {
            num_workers: 4,
            live_workers: 4,
            active_workers: 2,
            jobs_completed: 80,
            jobs_failed: 20,
            jobs_skipped: 3,
            average_job_duration: Duration::from_secs(60),
            queue_size: 7,
        };

        assert_eq!(stats.total_processed(), 100);
        assert!((stats.success_rate() - 80.0).abs() < f64::EPSILON);

        let text = stats.to_string();
        assert!(text.contains("4/4 live"));
        assert!(text.contains("queue 7"));
        assert!(text.contains("skipped 3"));
    }

    #[test]
    fn test_shared_pool_stats() {
        let stats = SharedPoolStats::new();

        stats.record(JobStatus::Completed, Duration::from_secs(10));
        stats.record(JobStatus::Completed, Duration::from_secs(20));
        stats.record(JobStatus::Failed, Duration::from_secs(5));
        stats.record(JobStatus::Skipped, Duration::from_secs(99));

        let pool_stats = stats.to_pool_stats(4, 2);

        assert_eq!(pool_stats.num_workers, 4);
        assert_eq!(pool_stats.queue_size, 2);
        assert_eq!(pool_stats.jobs_completed, 2);
        assert_eq!(pool_stats.jobs_failed, 1);
        assert_eq!(pool_stats.jobs_skipped, 1);
        // Skips do not count toward the average: (10000 + 20000 + 5000) / 3
        assert!(pool_stats.average_job_duration.as_millis() > 11000);
        assert!(pool_stats.average_job_duration.as_millis() < 12000);
    }

    #[test]
    fn test_shared_pool_stats_workers() {
        let stats = SharedPoolStats::new();

        stats.increment_live();
        stats.increment_live();
        stats.increment_active();
        stats.increment_active();
        stats.decrement_active();
        stats.decrement_live();

        let pool_stats = stats.to_pool_stats(2, 0);
        assert_eq!(pool_stats.live_workers, 1);
        assert_eq!(pool_stats.active_workers, 1);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp).with_num_workers(0);

        let err = WorkerPool::new(config, upper_factory()).err().unwrap();
        assert!(matches!(err, PoolError::Config(_)));
        assert!(err.to_string().contains("num_workers"));
    }

    #[tokio::test]
    async fn test_stop_without_start_is_noop() {
        let temp = TempDir::new().unwrap();
        let mut pool = WorkerPool::new(test_config(&temp), upper_factory()).unwrap();

        assert!(!pool.is_running());
        pool.stop().await.unwrap();
        pool.stop().await.unwrap();
        assert!(pool.status().starts_with("stopped"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_start_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let mut pool =
            WorkerPool::new(test_config(&temp).with_num_workers(2), upper_factory()).unwrap();

        pool.start().await.unwrap();
        pool.start().await.unwrap();
        assert!(pool.is_running());
        assert!(pool.status().starts_with("running"));

        wait_for(|| pool.stats().live_workers == 2).await;
        pool.stop().await.unwrap();

        assert!(!pool.is_running());
        assert_eq!(pool.stats().live_workers, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_missing_processing_file_is_skipped() {
        let temp = TempDir::new().unwrap();
        let mut pool = WorkerPool::new(test_config(&temp), upper_factory()).unwrap();
        pool.start().await.unwrap();

        pool.queue().enqueue(JobId::new("ghost").unwrap());
        wait_for(|| pool.stats().jobs_skipped == 1).await;
        pool.stop().await.unwrap();

        let stats = pool.stats();
        assert_eq!(stats.jobs_completed, 0);
        assert_eq!(stats.jobs_failed, 0);
        assert!(fs::read_dir(temp.path().join("output")).unwrap().next().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_executor_init_failure_degrades_pool() {
        let temp = TempDir::new().unwrap();
        let factory: Arc<dyn ExecutorFactory> = Arc::new(
            |_model: &std::path::Path| -> Result<Box<dyn Executor>, ExecutorError> {
                Err(ExecutorError::Init("no such model".to_string()))
            },
        );
        let mut pool = WorkerPool::new(test_config(&temp).with_num_workers(3), factory).unwrap();

        pool.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(pool.stats().live_workers, 0);
        pool.stop().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_executor_panic_fails_job_and_rebuilds_executor() {
        use std::sync::atomic::AtomicUsize;

        let temp = TempDir::new().unwrap();
        let created = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&created);
        let factory: Arc<dyn ExecutorFactory> = Arc::new(
            move |_model: &std::path::Path| -> Result<Box<dyn Executor>, ExecutorError> {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(|input: &str| -> Result<String, ExecutorError> {
                    if input == "boom" {
                        panic!("executor blew up");
                    }
                    Ok(input.to_uppercase())
                }))
            },
        );
        let config = test_config(&temp);
        let mut pool = WorkerPool::new(config.clone(), factory).unwrap();
        pool.start().await.unwrap();
        wait_for(|| pool.stats().live_workers == 1).await;

        fs::write(config.input_dir.join("a.txt"), "boom").unwrap();
        wait_for(|| pool.stats().jobs_failed == 1).await;

        fs::write(config.input_dir.join("b.txt"), "fine").unwrap();
        wait_for(|| pool.stats().jobs_completed == 1).await;

        assert_eq!(pool.stats().live_workers, 1);
        assert_eq!(created.load(Ordering::SeqCst), 2);
        pool.stop().await.unwrap();

        assert_eq!(
            fs::read_to_string(config.failed_dir().join("a.txt")).unwrap(),
            "boom"
        );
        assert!(!config.output_dir.join("a.txt").exists());
        assert_eq!(
            fs::read_to_string(config.output_dir.join("b.txt")).unwrap(),
            "FINE"
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_drop_running_pool_cancels_scanner() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let mut pool = WorkerPool::new(config.clone(), upper_factory()).unwrap();
        pool.start().await.unwrap();
        wait_for(|| pool.stats().live_workers == 1).await;
        drop(pool);

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(config.input_dir.join("late.txt"), "late").unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(config.input_dir.join("late.txt").exists());
        assert!(!config.output_dir.join("late.txt").exists());
    }

    #[test]
    fn test_pool_error_display() {
        let err = PoolError::Config(ConfigError::ValidationFailed("bad".to_string()));
        assert!(err.to_string().contains("bad"));
    }
}
