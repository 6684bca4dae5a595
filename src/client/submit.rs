//! Job submission.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::scheduler::job::{JobId, JobLocation, COUNTER_FILE};
use crate::scheduler::spool::{Spool, PARTIAL_SUFFIX};

use super::ClientError;

/// Allocation attempts before [`Submitter::submit`] gives up.
const MAX_ID_ATTEMPTS: usize = 16;

/// Builds a job id of the form `YYYYmmddHHMMSS_NNNNNN`.
pub fn format_job_id(at: NaiveDateTime, sequence: u64) -> Result<JobId, ClientError> {
    Ok(JobId::new(format!(
        "{}_{:06}",
        at.format("%Y%m%d%H%M%S"),
        sequence
    ))?)
}

/// Hands out job ids from local time and a sequence counter persisted in
/// `<input_dir>/.counter`.
///
/// The counter is shared with any other submitter on the same input
/// directory but is not locked across processes. Collisions are caught at
/// write time by [`Submitter::submit`].
#[derive(Debug)]
pub struct JobIdAllocator {
    counter_path: PathBuf,
    lock: Mutex<()>,
}

impl JobIdAllocator {
    /// Creates an allocator backed by `<input_dir>/.counter`.
    pub fn new(input_dir: &Path) -> Self {
        Self {
            counter_path: input_dir.join(COUNTER_FILE),
            lock: Mutex::new(()),
        }
    }

    /// Returns the next id and advances the counter.
    pub async fn next_id(&self) -> Result<JobId, ClientError> {
        let _guard = self.lock.lock().await;

        let sequence = self.load_counter().await;
        let id = format_job_id(Local::now().naive_local(), sequence)?;

        tokio::fs::write(&self.counter_path, (sequence + 1).to_string())
            .await
            .map_err(|source| ClientError::Io {
                path: self.counter_path.clone(),
                source,
            })?;

        Ok(id)
    }

    /// Current counter value. Missing or unreadable counters start at 1.
    async fn load_counter(&self) -> u64 {
        match tokio::fs::read_to_string(&self.counter_path).await {
            Ok(text) => text.trim().parse().unwrap_or_else(|_| {
                warn!(path = %self.counter_path.display(), "Unreadable job counter, restarting at 1");
                1
            }),
            Err(_) => 1,
        }
    }
}

/// Places new jobs in the input directory.
#[derive(Debug)]
pub struct Submitter {
    spool: Spool,
    allocator: JobIdAllocator,
}

impl Submitter {
    /// Creates a submitter that drops jobs into the spool's input directory.
    pub fn new(spool: Spool) -> Self {
        Self {
            allocator: JobIdAllocator::new(spool.input_dir()),
            spool,
        }
    }

    /// Creates a job with `content` as its payload and returns its id.
    ///
    /// The payload is written to `<id>.part` and renamed to `<id>.txt`, so
    /// the scanner never claims a half-written job.
    pub async fn submit(&self, content: &str) -> Result<JobId, ClientError> {
        if content.is_empty() {
            return Err(ClientError::EmptyContent);
        }

        let input_dir = self.spool.input_dir();
        tokio::fs::create_dir_all(input_dir)
            .await
            .map_err(|source| ClientError::Io {
                path: input_dir.to_path_buf(),
                source,
            })?;

        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.allocator.next_id().await?;
            let job_path = self.spool.path(JobLocation::Input, &id);
            if tokio::fs::try_exists(&job_path).await.unwrap_or(false) {
                debug!(job_id = %id, "Job id already taken, allocating another");
                continue;
            }

            let part_path = input_dir.join(format!("{}{}", id, PARTIAL_SUFFIX));
            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&part_path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    debug!(job_id = %id, "Job id being written by another submitter");
                    continue;
                }
                Err(source) => {
                    return Err(ClientError::Io {
                        path: part_path,
                        source,
                    })
                }
            };

            let written: std::io::Result<()> = async {
                file.write_all(content.as_bytes()).await?;
                file.sync_all().await?;
                drop(file);
                tokio::fs::rename(&part_path, &job_path).await
            }
            .await;

            if let Err(source) = written {
                let _ = tokio::fs::remove_file(&part_path).await;
                return Err(ClientError::Io {
                    path: job_path,
                    source,
                });
            }

            info!(job_id = %id, bytes = content.len(), "Job submitted");
            return Ok(id);
        }

        Err(ClientError::IdExhausted(MAX_ID_ATTEMPTS))
    }

    /// Ids waiting in the input directory, sorted.
    pub async fn list_pending(&self) -> Result<Vec<JobId>, ClientError> {
        Ok(self.spool.list(JobLocation::Input).await?)
    }

    pub fn spool(&self) -> &Spool {
        &self.spool
    }
}
