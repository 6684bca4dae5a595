//! Execution capability used by workers to turn a job payload into a result.
//!
//! The spool treats execution as an opaque, synchronous call:
//!
//! - [`ExecutorFactory::create`] runs once per worker, at worker startup, and
//!   receives the configured model handle. It may be expensive (loading a
//!   model, spawning a helper).
//! - [`Executor::execute`] runs once per job on the blocking thread pool and
//!   may take minutes.
//!
//! Executors must be idempotent per invocation: a job interrupted by a crash
//! is re-run from scratch on the next start.
//!
//! Closures implement both traits, which keeps tests and embedding simple:
//!
//! ```rust,ignore
//! use spoolq::executor::{Executor, ExecutorError};
//! use std::path::Path;
//!
//! let factory = |_model: &Path| -> Result<Box<dyn Executor>, ExecutorError> {
//!     Ok(Box::new(|input: &str| -> Result<String, ExecutorError> {
//!         Ok(input.to_uppercase())
//!     }))
//! };
//! ```

pub mod command;

use std::path::Path;

use thiserror::Error;

pub use command::{CommandExecutor, CommandFactory};

/// Errors raised by an execution capability.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The capability could not be initialized for a worker.
    #[error("executor initialization failed: {0}")]
    Init(String),

    /// A single execution failed.
    #[error("execution failed: {0}")]
    Failed(String),

    /// The executor panicked while running a job.
    #[error("executor panicked: {0}")]
    Panicked(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A per-worker execution capability.
pub trait Executor: Send {
    /// Runs one job synchronously.
    fn execute(&mut self, input: &str) -> Result<String, ExecutorError>;
}

impl<F> Executor for F
where
    F: FnMut(&str) -> Result<String, ExecutorError> + Send,
{
    fn execute(&mut self, input: &str) -> Result<String, ExecutorError> {
        self(input)
    }
}

/// Builds one [`Executor`] per worker from the configured model handle.
pub trait ExecutorFactory: Send + Sync {
    fn create(&self, model: &Path) -> Result<Box<dyn Executor>, ExecutorError>;
}

impl<F> ExecutorFactory for F
where
    F: Fn(&Path) -> Result<Box<dyn Executor>, ExecutorError> + Send + Sync,
{
    fn create(&self, model: &Path) -> Result<Box<dyn Executor>, ExecutorError> {
        self(model)
    }
}
