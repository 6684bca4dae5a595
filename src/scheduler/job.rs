//! Job definitions for the spool.
//!
//! A job has no metadata record of its own. Its identity is the file name
//! `<id>.txt` and its state is whichever spool directory currently holds
//! that file:
//!
//! - `JobId`: validated identifier, convertible to and from file names
//! - `JobLocation`: the directory (and therefore state) a job is in
//! - `JobStatus`: terminal outcome of one execution attempt

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sequence state kept in the input directory by the submitter.
pub const COUNTER_FILE: &str = ".counter";

const JOB_SUFFIX: &str = ".txt";

/// Errors produced when validating a job identifier.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobIdError {
    #[error("job id cannot be empty")]
    Empty,

    #[error("job id '{0}' contains a path separator")]
    PathSeparator(String),

    #[error("job id '{0}' must not carry the .txt suffix")]
    HasSuffix(String),

    #[error("job id '{0}' is reserved")]
    Reserved(String),
}

/// Identifier of a job.
///
/// Opaque to the spool, but lexically sortable when produced by the
/// submitter (`YYYYmmddHHMMSS_NNNNNN`). Dispatch order never relies on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobId(String);

impl JobId {
    /// Creates a job id, rejecting values that cannot round-trip through a
    /// file name.
    pub fn new(id: impl Into<String>) -> Result<Self, JobIdError> {
        let id = id.into();

        if id.is_empty() {
            return Err(JobIdError::Empty);
        }
        if id.contains('/') || id.contains('\\') {
            return Err(JobIdError::PathSeparator(id));
        }
        if id.ends_with(JOB_SUFFIX) {
            return Err(JobIdError::HasSuffix(id));
        }
        if id == COUNTER_FILE || id == "." || id == ".." {
            return Err(JobIdError::Reserved(id));
        }

        Ok(Self(id))
    }

    /// Derives the job id from a directory entry name.
    ///
    /// Returns `None` for anything that is not a job file: wrong extension,
    /// the counter file, or a bare `.txt`.
    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::parse_file_name(name)?.ok()
    }

    /// Like [`from_file_name`](Self::from_file_name), but keeps the reason a
    /// `.txt` file was rejected.
    ///
    /// `None` means the entry is not a job file at all; `Some(Err(_))` means
    /// it looks like one but its stem is not a valid id.
    pub fn parse_file_name(name: &str) -> Option<Result<Self, JobIdError>> {
        if name == COUNTER_FILE {
            return None;
        }
        let stem = name.strip_suffix(JOB_SUFFIX)?;
        Some(Self::new(stem))
    }

    /// File name of this job in any spool directory.
    pub fn file_name(&self) -> String {
        format!("{}{}", self.0, JOB_SUFFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl FromStr for JobId {
    type Err = JobIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for JobId {
    type Error = JobIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<JobId> for String {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The spool directory a job currently sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobLocation {
    /// Dropped by a producer, not yet claimed.
    Input,
    /// Claimed by the scanner or recovery pass, awaiting or under execution.
    Processing,
    /// Executed successfully; file content is the result.
    Output,
    /// Execution failed; file content is the original payload.
    Failed,
}

impl JobLocation {
    /// All locations, in lifecycle order.
    pub const ALL: [JobLocation; 4] = [
        JobLocation::Input,
        JobLocation::Processing,
        JobLocation::Output,
        JobLocation::Failed,
    ];
}

impl fmt::Display for JobLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobLocation::Input => write!(f, "pending"),
            JobLocation::Processing => write!(f, "processing"),
            JobLocation::Output => write!(f, "completed"),
            JobLocation::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of one dispatch of a job to a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Result written to the output directory.
    Completed,
    /// Moved to the failed directory.
    Failed,
    /// Processing copy was gone at dispatch time; nothing was executed.
    Skipped,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Skipped => write!(f, "skipped"),
        }
    }
}
