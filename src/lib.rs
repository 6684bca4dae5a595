//! spoolq: durable filesystem job queue with a local worker pool.
//!
//! Jobs are text files. A client drops `<id>.txt` into the input directory;
//! the server claims it by renaming it into a processing directory, runs an
//! executor on its content, and writes the result to the output directory.
//! Every state lives on disk, so a crash loses nothing: jobs left in
//! processing are re-run on the next start.

pub mod cli;
pub mod client;
pub mod config;
pub mod executor;
pub mod metrics;
pub mod scheduler;

// Re-export commonly used types
pub use client::{ClientError, Results, Submitter};
pub use config::{ConfigError, SpoolConfig};
pub use executor::{Executor, ExecutorError, ExecutorFactory};
pub use scheduler::{JobId, JobLocation, PoolError, PoolStats, Spool, SpoolError, WorkerPool};
