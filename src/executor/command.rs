//! Executor that runs an external program per job.
//!
//! The model handle is the program to run. The job payload is written to
//! its stdin and its stdout becomes the result. A non-zero exit status fails
//! the job with the program's stderr as the reason.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tracing::debug;

use super::{Executor, ExecutorError, ExecutorFactory};

/// Creates a [`CommandExecutor`] per worker.
#[derive(Debug, Clone, Default)]
pub struct CommandFactory {
    args: Vec<String>,
}

impl CommandFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extra arguments passed to the program on every invocation.
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl ExecutorFactory for CommandFactory {
    fn create(&self, model: &Path) -> Result<Box<dyn Executor>, ExecutorError> {
        if !model.is_file() {
            return Err(ExecutorError::Init(format!(
                "program not found: {}",
                model.display()
            )));
        }

        Ok(Box::new(CommandExecutor {
            program: model.to_path_buf(),
            args: self.args.clone(),
        }))
    }
}

/// Runs one program invocation per job.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandExecutor {
    /// Program run for every job.
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn run(&self, input: &str) -> Result<Output, ExecutorError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Feed stdin from a separate thread: a program that writes a lot
        // before reading everything would otherwise deadlock on full pipes.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = input.to_owned();
            std::thread::spawn(move || stdin.write_all(input.as_bytes()))
        });

        let output = child.wait_with_output()?;

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                // The program may legitimately exit without reading stdin.
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => return Err(ExecutorError::Io(e)),
                Err(_) => {
                    return Err(ExecutorError::Failed(
                        "stdin writer thread panicked".to_string(),
                    ))
                }
            }
        }

        Ok(output)
    }
}

impl Executor for CommandExecutor {
    fn execute(&mut self, input: &str) -> Result<String, ExecutorError> {
        debug!(program = %self.program.display(), bytes = input.len(), "Running command");

        let output = self.run(input)?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();

        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(ExecutorError::Failed(if stderr.is_empty() {
            format!("exit code: {:?}", output.status.code())
        } else {
            stderr
        }))
    }
}
