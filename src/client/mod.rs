//! Client side of the spool: submitting jobs and reading results.
//!
//! Clients never talk to the server. They share only the directory layout:
//! a job is submitted by placing `<id>.txt` in the input directory and its
//! result is read from `<id>.txt` in the output directory.

pub mod results;
pub mod submit;

use std::path::PathBuf;

use thiserror::Error;

use crate::scheduler::{JobIdError, SpoolError};

pub use results::{JobResult, Results};
pub use submit::{format_job_id, JobIdAllocator, Submitter};

/// Errors raised by [`Submitter`] and [`Results`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// Job content must not be empty.
    #[error("Cannot create job with empty content")]
    EmptyContent,

    /// Every allocated id was already taken.
    #[error("Could not allocate a free job id after {0} attempts")]
    IdExhausted(usize),

    #[error("Invalid job id: {0}")]
    InvalidId(#[from] JobIdError),

    /// Reading or writing a client-side file failed.
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Spool(#[from] SpoolError),
}
