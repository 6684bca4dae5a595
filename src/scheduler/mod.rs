//! Durable filesystem job queue with a worker pool.
//!
//! This module provides the server side of the spool:
//!
//! - **Spool**: the four job directories and the atomic renames between them
//! - **Scanner**: polls the input directory and claims new jobs
//! - **WorkQueue**: in-memory FIFO handing claimed ids to workers
//! - **WorkerPool**: lifecycle controller owning the scanner and the workers
//!
//! # Architecture
//!
//! ```text
//!      producers (spoolq push, any process writing <id>.txt)
//!                             │
//!                      ┌──────▼───────┐
//!                      │  input dir   │
//!                      └──────┬───────┘
//!                             │ Scanner: rename (claim)
//!                      ┌──────▼───────┐     Recovery (startup)
//!                      │ processing   │──────────┐
//!                      └──────┬───────┘          │
//!                             │ enqueue id       │
//!                      ┌──────▼───────┐          │
//!                      │  WorkQueue   │◄─────────┘
//!                      └──────┬───────┘
//!         ┌───────────────────┼───────────────────┐
//!         ▼                   ▼                   ▼
//!    ┌─────────┐         ┌─────────┐         ┌─────────┐
//!    │ Worker 1│         │ Worker 2│         │ Worker N│
//!    └────┬────┘         └────┬────┘         └────┬────┘
//!         └──── output dir (success) / failed dir (error)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use spoolq::config::SpoolConfig;
//! use spoolq::executor::CommandFactory;
//! use spoolq::scheduler::WorkerPool;
//! use std::sync::Arc;
//!
//! let config = SpoolConfig::new("/usr/local/bin/summarize").with_num_workers(2);
//! let mut pool = WorkerPool::new(config, Arc::new(CommandFactory::new()))?;
//! pool.start().await?;
//!
//! // ...
//!
//! pool.stop().await?;
//! ```
//!
//! # Reliability Features
//!
//! - **Atomic claim**: a job belongs to whoever renamed it out of input
//! - **Crash recovery**: jobs left in processing are re-enqueued on start
//! - **Duplicate safeguard**: recovery skips jobs that already have a result
//! - **Failed directory**: failed jobs keep their original payload for inspection
//! - **Graceful shutdown**: workers finish queued jobs before stopping

pub mod job;
pub mod queue;
pub mod scanner;
pub mod spool;
pub mod worker_pool;

// Re-export main types for convenience
pub use job::{JobId, JobIdError, JobLocation, JobStatus};
pub use queue::WorkQueue;
pub use scanner::{recover, RecoveryReport, ScanReport, Scanner};
pub use spool::{Completion, Spool, SpoolError};
pub use worker_pool::{PoolError, PoolStats, WorkerPool};
