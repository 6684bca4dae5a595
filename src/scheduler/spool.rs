//! Filesystem-backed job spool.
//!
//! Job state is encoded purely by which directory holds `<id>.txt`:
//!
//! - `{input}`: pending jobs dropped by producers
//! - `{input}_processing`: jobs claimed for dispatch (for crash recovery)
//! - `{output}`: completed jobs, content is the result
//! - `{input}_failed`: jobs whose execution failed, content is the payload
//!
//! # Reliability
//!
//! Jobs move between directories with `rename`, which is atomic within a
//! single volume, so a job is never visible in two directories at once and
//! never in none. All four directories must live on the same filesystem.
//! Results are written to a `.part` file first and renamed into place, so a
//! reader of the output directory never sees a partial result.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::job::{JobId, JobLocation};

/// Suffix of in-flight writes; never matches the job naming convention.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Errors that can occur during spool operations.
#[derive(Debug, Error)]
pub enum SpoolError {
    /// A spool directory could not be created.
    #[error("failed to create directory {}: {source}", .dir.display())]
    CreateDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A spool directory could not be enumerated.
    #[error("failed to list {}: {source}", .dir.display())]
    List {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Moving a job between directories failed.
    #[error("failed to move job {id} from {from} to {to}: {source}")]
    Move {
        id: JobId,
        from: JobLocation,
        to: JobLocation,
        #[source]
        source: io::Error,
    },

    /// Reading a job file failed.
    #[error("failed to read job {id}: {source}")]
    Read {
        id: JobId,
        #[source]
        source: io::Error,
    },

    /// Writing a job result failed.
    #[error("failed to write result for job {id}: {source}")]
    WriteOutput {
        id: JobId,
        #[source]
        source: io::Error,
    },

    /// Removing a job file failed.
    #[error("failed to remove {location} copy of job {id}: {source}")]
    Remove {
        id: JobId,
        location: JobLocation,
        #[source]
        source: io::Error,
    },
}

/// Result of [`Spool::complete`].
#[derive(Debug)]
pub enum Completion {
    /// Output written and processing copy removed.
    Clean,
    /// Output written, but the processing copy could not be removed.
    CleanupFailed(io::Error),
}

/// Returns `<dir><suffix>` as a sibling of `dir`, ignoring trailing separators.
pub fn sibling_dir(dir: &Path, suffix: &str) -> PathBuf {
    let normalized: PathBuf = dir.components().collect();
    let mut name = normalized.into_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// The four spool directories and the moves between them.
#[derive(Debug, Clone)]
pub struct Spool {
    input_dir: PathBuf,
    processing_dir: PathBuf,
    output_dir: PathBuf,
    failed_dir: PathBuf,
}

impl Spool {
    /// Creates a spool with processing and failed directories derived from
    /// the input directory (`<input>_processing`, `<input>_failed`).
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        let input_dir = input_dir.into();
        Self {
            processing_dir: sibling_dir(&input_dir, "_processing"),
            failed_dir: sibling_dir(&input_dir, "_failed"),
            input_dir,
            output_dir: output_dir.into(),
        }
    }

    /// Directory producers drop new jobs into.
    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    /// Directory holding claimed jobs.
    pub fn processing_dir(&self) -> &Path {
        &self.processing_dir
    }

    /// Directory holding results.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Directory holding jobs whose execution failed.
    pub fn failed_dir(&self) -> &Path {
        &self.failed_dir
    }

    /// Directory backing a location.
    pub fn dir(&self, location: JobLocation) -> &Path {
        match location {
            JobLocation::Input => &self.input_dir,
            JobLocation::Processing => &self.processing_dir,
            JobLocation::Output => &self.output_dir,
            JobLocation::Failed => &self.failed_dir,
        }
    }

    /// Path of a job's file in a location.
    pub fn path(&self, location: JobLocation, id: &JobId) -> PathBuf {
        self.dir(location).join(id.file_name())
    }

    /// Creates the input, processing and output directories.
    ///
    /// The failed directory is created lazily on the first failure.
    pub async fn ensure_dirs(&self) -> Result<(), SpoolError> {
        for dir in [&self.input_dir, &self.processing_dir, &self.output_dir] {
            fs::create_dir_all(dir)
                .await
                .map_err(|source| SpoolError::CreateDir {
                    dir: dir.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Lists the jobs in a location, sorted by id.
    ///
    /// Entries that are not regular job files are skipped, and so is any
    /// single entry that cannot be inspected. Only failing to open the
    /// directory itself is an error. A missing failed directory is empty.
    pub async fn list(&self, location: JobLocation) -> Result<Vec<JobId>, SpoolError> {
        let dir = self.dir(location);

        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound && location == JobLocation::Failed => {
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(SpoolError::List {
                    dir: dir.to_path_buf(),
                    source,
                })
            }
        };

        let mut jobs = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Failed to read directory entry");
                    break;
                }
            };

            match entry.file_type().await {
                Ok(ft) if ft.is_file() => {}
                Ok(_) => continue,
                Err(e) => {
                    debug!(path = %entry.path().display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            }

            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            match JobId::parse_file_name(name) {
                Some(Ok(id)) => jobs.push(id),
                Some(Err(e)) => {
                    warn!(
                        path = %entry.path().display(),
                        error = %e,
                        "Ignoring job file with invalid name"
                    );
                }
                None => {}
            }
        }

        jobs.sort();
        Ok(jobs)
    }

    /// Returns whether the job has a file in the given location.
    pub async fn contains(&self, location: JobLocation, id: &JobId) -> bool {
        fs::try_exists(self.path(location, id))
            .await
            .unwrap_or(false)
    }

    /// Finds the location currently holding a job.
    ///
    /// Terminal locations are checked first, so a completed job whose
    /// processing copy was never cleaned up reports as completed.
    pub async fn locate(&self, id: &JobId) -> Option<JobLocation> {
        for location in [
            JobLocation::Output,
            JobLocation::Failed,
            JobLocation::Processing,
            JobLocation::Input,
        ] {
            if self.contains(location, id).await {
                return Some(location);
            }
        }
        None
    }

    /// Claims a pending job by renaming it into the processing directory.
    pub async fn claim(&self, id: &JobId) -> Result<(), SpoolError> {
        self.rename(id, JobLocation::Input, JobLocation::Processing)
            .await
    }

    /// Reads the payload of a claimed job.
    pub async fn read_payload(&self, id: &JobId) -> Result<String, SpoolError> {
        fs::read_to_string(self.path(JobLocation::Processing, id))
            .await
            .map_err(|source| SpoolError::Read {
                id: id.clone(),
                source,
            })
    }

    /// Reads a completed job's result.
    pub async fn read_output(&self, id: &JobId) -> Result<String, SpoolError> {
        fs::read_to_string(self.path(JobLocation::Output, id))
            .await
            .map_err(|source| SpoolError::Read {
                id: id.clone(),
                source,
            })
    }

    /// Durably writes a job's result, then removes its processing copy.
    ///
    /// The processing copy is only touched after the result is in place.
    /// Failing to remove it is reported as [`Completion::CleanupFailed`]
    /// rather than an error: the job is complete either way.
    pub async fn complete(&self, id: &JobId, output: &str) -> Result<Completion, SpoolError> {
        let final_path = self.path(JobLocation::Output, id);
        let partial_path = self
            .output_dir
            .join(format!("{}{}", id.file_name(), PARTIAL_SUFFIX));

        let write_err = |source: io::Error| SpoolError::WriteOutput {
            id: id.clone(),
            source,
        };

        fs::create_dir_all(&self.output_dir)
            .await
            .map_err(write_err)?;

        let mut file = fs::File::create(&partial_path).await.map_err(write_err)?;
        file.write_all(output.as_bytes()).await.map_err(write_err)?;
        file.sync_all().await.map_err(write_err)?;
        drop(file);

        if let Err(e) = fs::rename(&partial_path, &final_path).await {
            let _ = fs::remove_file(&partial_path).await;
            return Err(write_err(e));
        }

        match fs::remove_file(self.path(JobLocation::Processing, id)).await {
            Ok(()) => Ok(Completion::Clean),
            Err(e) => Ok(Completion::CleanupFailed(e)),
        }
    }

    /// Moves a claimed job into the failed directory, creating it if absent.
    pub async fn fail(&self, id: &JobId) -> Result<(), SpoolError> {
        fs::create_dir_all(&self.failed_dir)
            .await
            .map_err(|source| SpoolError::CreateDir {
                dir: self.failed_dir.clone(),
                source,
            })?;

        self.rename(id, JobLocation::Processing, JobLocation::Failed)
            .await
    }

    /// Removes a job's file from a location.
    pub async fn remove(&self, location: JobLocation, id: &JobId) -> Result<(), SpoolError> {
        fs::remove_file(self.path(location, id))
            .await
            .map_err(|source| SpoolError::Remove {
                id: id.clone(),
                location,
                source,
            })
    }

    async fn rename(&self, id: &JobId, from: JobLocation, to: JobLocation) -> Result<(), SpoolError> {
        fs::rename(self.path(from, id), self.path(to, id))
            .await
            .map_err(|source| SpoolError::Move {
                id: id.clone(),
                from,
                to,
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as stdfs;
    use tempfile::TempDir;

    fn create_test_spool(root: &Path) -> Spool {
        Spool::new(root.join("input"), root.join("output"))
    }

    fn id(s: &str) -> JobId {
        JobId::new(s).unwrap()
    }

    #[test]
    fn test_sibling_dir() {
        assert_eq!(
            sibling_dir(Path::new("data/input"), "_processing"),
            PathBuf::from("data/input_processing")
        );
        assert_eq!(
            sibling_dir(Path::new("data/input/"), "_failed"),
            PathBuf::from("data/input_failed")
        );
    }

    #[test]
    fn test_derived_dirs() {
        let spool = Spool::new("/srv/q/in", "/srv/q/out");
        assert_eq!(spool.processing_dir(), Path::new("/srv/q/in_processing"));
        assert_eq!(spool.failed_dir(), Path::new("/srv/q/in_failed"));
        assert_eq!(
            spool.path(JobLocation::Output, &id("a")),
            PathBuf::from("/srv/q/out/a.txt")
        );
    }

    #[tokio::test]
    async fn test_list_filters_and_sorts() {
        let temp = TempDir::new().unwrap();
        let spool = create_test_spool(temp.path());
        spool.ensure_dirs().await.unwrap();

        let input = spool.input_dir();
        stdfs::write(input.join("b.txt"), "2").unwrap();
        stdfs::write(input.join("a.txt"), "1").unwrap();
        stdfs::write(input.join(".counter"), "3").unwrap();
        stdfs::write(input.join("c.json"), "{}").unwrap();
        stdfs::write(input.join("d.part"), "partial").unwrap();
        stdfs::create_dir(input.join("e.txt")).unwrap();

        let jobs = spool.list(JobLocation::Input).await.unwrap();
        assert_eq!(jobs, vec![id("a"), id("b")]);
    }

    #[tokio::test]
    async fn test_list_skips_invalid_job_name_and_leaves_it() {
        let temp = TempDir::new().unwrap();
        let spool = create_test_spool(temp.path());
        spool.ensure_dirs().await.unwrap();

        let input = spool.input_dir();
        stdfs::write(input.join("x.txt.txt"), "doubled").unwrap();
        stdfs::write(input.join("ok.txt"), "fine").unwrap();

        let jobs = spool.list(JobLocation::Input).await.unwrap();
        assert_eq!(jobs, vec![id("ok")]);
        assert!(input.join("x.txt.txt").exists());
    }

    #[tokio::test]
    async fn test_list_missing_failed_dir_is_empty() {
        let temp = TempDir::new().unwrap();
        let spool = create_test_spool(temp.path());
        spool.ensure_dirs().await.unwrap();

        assert!(spool.list(JobLocation::Failed).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_missing_input_dir_errors() {
        let temp = TempDir::new().unwrap();
        let spool = create_test_spool(temp.path());

        let err = spool.list(JobLocation::Input).await.unwrap_err();
        assert!(matches!(err, SpoolError::List { .. }));
    }

    #[tokio::test]
    async fn test_claim_moves_exactly_once() {
        let temp = TempDir::new().unwrap();
        let spool = create_test_spool(temp.path());
        spool.ensure_dirs().await.unwrap();
        stdfs::write(spool.path(JobLocation::Input, &id("a")), "hello").unwrap();

        spool.claim(&id("a")).await.unwrap();

        assert!(!spool.contains(JobLocation::Input, &id("a")).await);
        assert!(spool.contains(JobLocation::Processing, &id("a")).await);
        assert_eq!(spool.read_payload(&id("a")).await.unwrap(), "hello");

        // A second claim finds nothing to move and leaves state untouched.
        let err = spool.claim(&id("a")).await.unwrap_err();
        assert!(matches!(err, SpoolError::Move { .. }));
        assert!(spool.contains(JobLocation::Processing, &id("a")).await);
    }

    #[tokio::test]
    async fn test_complete_writes_output_then_removes_processing() {
        let temp = TempDir::new().unwrap();
        let spool = create_test_spool(temp.path());
        spool.ensure_dirs().await.unwrap();
        stdfs::write(spool.path(JobLocation::Processing, &id("a")), "hello").unwrap();

        let completion = spool.complete(&id("a"), "HELLO").await.unwrap();

        assert!(matches!(completion, Completion::Clean));
        assert_eq!(spool.read_output(&id("a")).await.unwrap(), "HELLO");
        assert!(!spool.contains(JobLocation::Processing, &id("a")).await);
        assert!(!spool.output_dir().join("a.txt.part").exists());
    }

    #[tokio::test]
    async fn test_complete_reports_cleanup_failure() {
        let temp = TempDir::new().unwrap();
        let spool = create_test_spool(temp.path());
        spool.ensure_dirs().await.unwrap();

        // No processing copy: output still lands, cleanup is reported.
        let completion = spool.complete(&id("ghost"), "out").await.unwrap();

        assert!(matches!(completion, Completion::CleanupFailed(_)));
        assert_eq!(spool.read_output(&id("ghost")).await.unwrap(), "out");
    }

    #[tokio::test]
    async fn test_fail_creates_failed_dir_and_keeps_payload() {
        let temp = TempDir::new().unwrap();
        let spool = create_test_spool(temp.path());
        spool.ensure_dirs().await.unwrap();
        stdfs::write(spool.path(JobLocation::Processing, &id("a")), "payload").unwrap();
        assert!(!spool.failed_dir().exists());

        spool.fail(&id("a")).await.unwrap();

        assert!(!spool.contains(JobLocation::Processing, &id("a")).await);
        let failed = stdfs::read_to_string(spool.path(JobLocation::Failed, &id("a"))).unwrap();
        assert_eq!(failed, "payload");
    }

    #[tokio::test]
    async fn test_locate_prefers_terminal_state() {
        let temp = TempDir::new().unwrap();
        let spool = create_test_spool(temp.path());
        spool.ensure_dirs().await.unwrap();

        assert_eq!(spool.locate(&id("a")).await, None);

        stdfs::write(spool.path(JobLocation::Input, &id("a")), "x").unwrap();
        assert_eq!(spool.locate(&id("a")).await, Some(JobLocation::Input));

        spool.claim(&id("a")).await.unwrap();
        assert_eq!(spool.locate(&id("a")).await, Some(JobLocation::Processing));

        stdfs::write(spool.path(JobLocation::Output, &id("a")), "y").unwrap();
        assert_eq!(spool.locate(&id("a")).await, Some(JobLocation::Output));
    }
}
