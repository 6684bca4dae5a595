//! Prometheus metrics registration and export.
//!
//! This module defines all Prometheus metrics used by spoolq and provides
//! functions for initializing, registering, and exporting metrics.

use prometheus::{CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

/// Global Prometheus registry for all spoolq metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Total job lifecycle events, labeled by event
/// (claimed, recovered, completed, failed, skipped).
pub static JOBS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Wall-clock time spent executing a job, in seconds.
pub static JOB_DURATION: OnceLock<Histogram> = OnceLock::new();

/// Number of job ids waiting in the in-memory work queue.
pub static QUEUE_DEPTH: OnceLock<Gauge> = OnceLock::new();

/// Number of workers currently executing a job.
pub static ACTIVE_WORKERS: OnceLock<Gauge> = OnceLock::new();

/// Number of workers whose executor initialized and that are accepting jobs.
pub static LIVE_WORKERS: OnceLock<Gauge> = OnceLock::new();

/// Initialize all metrics and register them with the registry.
///
/// Call once at startup. Later calls build a fresh registry but leave the
/// first one in place, so repeated initialization is harmless.
///
/// # Errors
///
/// Returns a `prometheus::Error` if metric registration fails, typically due to
/// duplicate metric names or invalid metric configurations.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let registry = Registry::new();

    let jobs_total = CounterVec::new(
        Opts::new("spoolq_jobs_total", "Total job lifecycle events"),
        &["event"],
    )?;

    let job_duration = Histogram::with_opts(
        HistogramOpts::new(
            "spoolq_job_duration_seconds",
            "Job execution duration in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
    )?;

    let queue_depth = Gauge::new("spoolq_queue_depth", "Number of jobs in the work queue")?;

    let active_workers = Gauge::new(
        "spoolq_active_workers",
        "Number of workers currently executing a job",
    )?;

    let live_workers = Gauge::new(
        "spoolq_live_workers",
        "Number of workers accepting jobs",
    )?;

    registry.register(Box::new(jobs_total.clone()))?;
    registry.register(Box::new(job_duration.clone()))?;
    registry.register(Box::new(queue_depth.clone()))?;
    registry.register(Box::new(active_workers.clone()))?;
    registry.register(Box::new(live_workers.clone()))?;

    // If any of these fail, metrics were already initialized (idempotent)
    let _ = REGISTRY.set(registry);
    let _ = JOBS_TOTAL.set(jobs_total);
    let _ = JOB_DURATION.set(job_duration);
    let _ = QUEUE_DEPTH.set(queue_depth);
    let _ = ACTIVE_WORKERS.set(active_workers);
    let _ = LIVE_WORKERS.set(live_workers);

    tracing::info!("Prometheus metrics initialized successfully");

    Ok(())
}

/// Export all registered metrics in Prometheus text format.
///
/// If the registry has not been initialized or encoding fails, the returned
/// text is a single Prometheus comment line describing the problem.
pub fn export_metrics() -> String {
    let Some(registry) = REGISTRY.get() else {
        return "# Metrics not initialized. Call init_metrics() first.\n".to_string();
    };

    let encoder = TextEncoder::new();
    let metric_families = registry.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return format!("# Error encoding metrics: {}\n", e);
    }

    String::from_utf8(buffer)
        .unwrap_or_else(|e| format!("# Error converting metrics to UTF-8: {}\n", e))
}

/// Writes the current metrics to `path` for a node-exporter textfile
/// collector.
///
/// The text goes to a sibling temporary file first and is renamed into
/// place, so a scraper never reads a half-written file.
pub async fn write_metrics_file(path: &std::path::Path) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    tokio::fs::write(&tmp, export_metrics()).await?;
    tokio::fs::rename(&tmp, path).await
}
