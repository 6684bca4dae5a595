//! Result retrieval and job status lookup.

use std::time::SystemTime;

use serde::Serialize;

use crate::scheduler::job::{JobId, JobLocation};
use crate::scheduler::spool::{Spool, SpoolError};

use super::ClientError;

/// A completed job and its result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobResult {
    pub id: JobId,
    pub output: String,
}

/// Read-only view of the output directory and job status.
#[derive(Debug, Clone)]
pub struct Results {
    spool: Spool,
}

impl Results {
    /// Creates a reader over the spool's output and status directories.
    pub fn new(spool: Spool) -> Self {
        Self { spool }
    }

    /// The result for `id`, or `None` if the job has not completed.
    pub async fn get(&self, id: &JobId) -> Result<Option<JobResult>, ClientError> {
        if !self.spool.contains(JobLocation::Output, id).await {
            return Ok(None);
        }

        let output = self.spool.read_output(id).await?;
        Ok(Some(JobResult {
            id: id.clone(),
            output,
        }))
    }

    /// The most recently written result.
    pub async fn latest(&self) -> Result<Option<JobResult>, ClientError> {
        let mut latest: Option<(SystemTime, JobId)> = None;

        for id in self.list_completed().await? {
            let path = self.spool.path(JobLocation::Output, &id);
            let Ok(modified) = tokio::fs::metadata(&path).await.and_then(|m| m.modified()) else {
                continue;
            };
            // Ties go to the later id, which sorts by submission time.
            if latest.as_ref().map_or(true, |(t, _)| modified >= *t) {
                latest = Some((modified, id));
            }
        }

        match latest {
            Some((_, id)) => self.get(&id).await,
            None => Ok(None),
        }
    }

    /// Completed job ids, sorted.
    pub async fn list_completed(&self) -> Result<Vec<JobId>, ClientError> {
        Ok(self.spool.list(JobLocation::Output).await?)
    }

    /// Where `id` currently is, or `None` if no directory holds it.
    pub async fn status(&self, id: &JobId) -> Option<JobLocation> {
        self.spool.locate(id).await
    }

    /// Every known job with its location, sorted by id.
    ///
    /// A job visible in more than one directory (for instance a completed
    /// job whose processing copy could not be removed) is reported once,
    /// at its most advanced location.
    pub async fn list_all(&self) -> Result<Vec<(JobId, JobLocation)>, SpoolError> {
        let mut jobs: Vec<(JobId, JobLocation)> = Vec::new();

        for location in JobLocation::ALL {
            for id in self.spool.list(location).await? {
                jobs.push((id, location));
            }
        }

        jobs.sort_by(|a, b| a.0.cmp(&b.0).then(rank(a.1).cmp(&rank(b.1))));
        jobs.dedup_by(|later, earlier| later.0 == earlier.0);
        Ok(jobs)
    }
}

/// Lower is further along.
fn rank(location: JobLocation) -> u8 {
    match location {
        JobLocation::Output => 0,
        JobLocation::Failed => 1,
        JobLocation::Processing => 2,
        JobLocation::Input => 3,
    }
}
