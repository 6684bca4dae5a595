//! CLI command definitions for spoolq.
//!
//! `serve` runs the scanner and worker pool against a spool directory. The
//! other commands are clients that only touch the filesystem, so they work
//! whether or not a server is running.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use crate::client::{Results, Submitter};
use crate::config::SpoolConfig;
use crate::executor::CommandFactory;
use crate::metrics::{init_metrics, write_metrics_file};
use crate::scheduler::{JobId, JobLocation, Spool, WorkerPool};

/// Durable filesystem job queue.
#[derive(Parser)]
#[command(name = "spoolq")]
#[command(about = "Durable filesystem job queue with a local worker pool")]
#[command(version)]
#[command(
    long_about = "spoolq runs a pool of workers over a spool directory.\n\nClients push a job by dropping a text file into the input directory; the server claims it, runs the model on it, and writes the result to the output directory. Jobs survive restarts.\n\nExample usage:\n  spoolq serve ./bin/summarize --workers 2\n  spoolq push \"Summarize this paragraph\"\n  spoolq pop"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub dirs: DirArgs,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Spool directory flags shared by every subcommand.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct DirArgs {
    /// Directory pending jobs are placed in [default: data/input].
    #[arg(long, env = "SPOOLQ_INPUT_DIR", global = true)]
    pub input_dir: Option<PathBuf>,

    /// Directory results are written to [default: data/output].
    #[arg(long, env = "SPOOLQ_OUTPUT_DIR", global = true)]
    pub output_dir: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run the scanner and worker pool until interrupted.
    Serve(ServeArgs),

    /// Submit a new job and print its id.
    Push(PushArgs),

    /// Print the result of a job, or the latest result.
    Pop(PopArgs),

    /// List every known job with its status.
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show where a job is in its lifecycle.
    Status(StatusArgs),
}

/// Arguments for `spoolq serve`.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Model handle passed to the executor: the program run once per job.
    pub model: Option<PathBuf>,

    /// Number of workers.
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Delay between scans of the input directory, in milliseconds.
    #[arg(long)]
    pub scan_interval_ms: Option<u64>,

    /// Delay between status log lines, in seconds.
    #[arg(long)]
    pub status_interval_secs: Option<u64>,

    /// Rewrite Prometheus metrics to this file on every status tick.
    #[arg(long)]
    pub metrics_file: Option<PathBuf>,

    /// YAML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Extra arguments passed to the model program.
    #[arg(last = true)]
    pub model_args: Vec<String>,
}

/// Arguments for `spoolq push`.
#[derive(Parser, Debug)]
pub struct PushArgs {
    /// Job content.
    #[arg(required_unless_present = "file", conflicts_with = "file")]
    pub content: Option<String>,

    /// Read job content from a file.
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

/// Arguments for `spoolq pop`.
#[derive(Parser, Debug)]
pub struct PopArgs {
    /// Job id. Defaults to the most recent result.
    pub job_id: Option<String>,

    /// Output JSON instead of plain text.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `spoolq list`.
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Output JSON instead of a table.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `spoolq status`.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Job id.
    pub job_id: String,

    /// Output JSON instead of plain text.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve(args) => run_serve_command(args, cli.dirs).await,
        Commands::Push(args) => run_push_command(args, cli.dirs).await,
        Commands::Pop(args) => run_pop_command(args, cli.dirs).await,
        Commands::List(args) => run_list_command(args, cli.dirs).await,
        Commands::Status(args) => run_status_command(args, cli.dirs).await,
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Layers CLI flags over the file and environment configuration.
fn serve_config(args: &ServeArgs, dirs: &DirArgs) -> anyhow::Result<SpoolConfig> {
    let mut config =
        SpoolConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    if let Some(model) = &args.model {
        config.model_path = model.clone();
    }
    if !args.model_args.is_empty() {
        config.model_args = args.model_args.clone();
    }
    if let Some(dir) = &dirs.input_dir {
        config.input_dir = dir.clone();
    }
    if let Some(dir) = &dirs.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(n) = args.workers {
        config.num_workers = n;
    }
    if let Some(ms) = args.scan_interval_ms {
        config.scan_interval = std::time::Duration::from_millis(ms);
    }
    if let Some(secs) = args.status_interval_secs {
        config.status_interval = std::time::Duration::from_secs(secs);
    }

    let config = config.resolve_paths()?;

    if config.model_path.as_os_str().is_empty() {
        anyhow::bail!("No model given: pass <MODEL> or set model_path in the config file");
    }
    if !config.model_path.exists() {
        anyhow::bail!("Model not found: {}", config.model_path.display());
    }
    config.validate()?;

    Ok(config)
}

/// Spool for the client commands: flags over the defaults.
fn client_spool(dirs: &DirArgs) -> anyhow::Result<Spool> {
    let mut config = SpoolConfig::default();
    if let Some(dir) = &dirs.input_dir {
        config.input_dir = dir.clone();
    }
    if let Some(dir) = &dirs.output_dir {
        config.output_dir = dir.clone();
    }
    Ok(config.resolve_paths()?.spool())
}

// ============================================================================
// Serve
// ============================================================================

async fn run_serve_command(args: ServeArgs, dirs: DirArgs) -> anyhow::Result<()> {
    let config = serve_config(&args, &dirs)?;

    if let Err(e) = init_metrics() {
        warn!(error = %e, "Failed to initialize metrics");
    }

    info!(
        model = %config.model_path.display(),
        num_workers = config.num_workers,
        input_dir = %config.input_dir.display(),
        output_dir = %config.output_dir.display(),
        "Starting spoolq server"
    );

    let factory = Arc::new(CommandFactory::new().with_args(config.model_args.clone()));
    let status_interval = config.status_interval;
    let mut pool = WorkerPool::new(config, factory)?;
    pool.start().await.context("Failed to start worker pool")?;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut ticker = tokio::time::interval(status_interval);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to listen for shutdown signals, stopping");
                }
                break;
            }
            _ = ticker.tick() => {
                info!(status = %pool.status(), "Pool status");
                if let Some(path) = &args.metrics_file {
                    if let Err(e) = write_metrics_file(path).await {
                        warn!(path = %path.display(), error = %e, "Failed to write metrics file");
                    }
                }
            }
        }
    }

    info!("Waiting for in-flight jobs to finish");
    pool.stop().await?;
    if let Some(path) = &args.metrics_file {
        if let Err(e) = write_metrics_file(path).await {
            warn!(path = %path.display(), error = %e, "Failed to write metrics file");
        }
    }
    info!(status = %pool.status(), "Server stopped");

    Ok(())
}

/// Resolves on SIGINT or SIGTERM (Ctrl-C elsewhere).
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, initiating graceful shutdown");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, initiating graceful shutdown");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl-C, initiating graceful shutdown");
    }

    Ok(())
}

// ============================================================================
// Client commands
// ============================================================================

#[derive(Debug, Serialize)]
struct JobEntry {
    id: JobId,
    status: String,
    path: PathBuf,
}

impl JobEntry {
    fn new(spool: &Spool, id: JobId, location: JobLocation) -> Self {
        Self {
            path: spool.path(location, &id),
            status: location.to_string(),
            id,
        }
    }
}

async fn run_push_command(args: PushArgs, dirs: DirArgs) -> anyhow::Result<()> {
    let content = match (args.content, args.file) {
        (_, Some(path)) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read job file: {}", path.display()))?,
        (Some(content), None) => content,
        (None, None) => anyhow::bail!("'push' requires content or --file <PATH>"),
    };

    let submitter = Submitter::new(client_spool(&dirs)?);
    let id = submitter
        .submit(&content)
        .await
        .context("Failed to create job")?;

    println!("{}", id);
    Ok(())
}

async fn run_pop_command(args: PopArgs, dirs: DirArgs) -> anyhow::Result<()> {
    let results = Results::new(client_spool(&dirs)?);

    let (result, latest) = match args.job_id {
        Some(raw) => {
            let id = JobId::new(raw)?;
            match results.get(&id).await? {
                Some(result) => (result, false),
                None => anyhow::bail!("Job {} not found or not completed", id),
            }
        }
        None => match results.latest().await? {
            Some(result) => (result, true),
            None => anyhow::bail!("No completed jobs found"),
        },
    };

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| anyhow::anyhow!("Failed to serialize JSON output: {}", e))?;
        println!("{}", json);
    } else {
        if latest {
            println!("Latest job: {}", result.id);
            println!("{}", "-".repeat(35));
        }
        println!("{}", result.output);
    }

    Ok(())
}

async fn run_list_command(args: ListArgs, dirs: DirArgs) -> anyhow::Result<()> {
    let spool = client_spool(&dirs)?;
    let results = Results::new(spool.clone());

    let entries: Vec<JobEntry> = results
        .list_all()
        .await?
        .into_iter()
        .map(|(id, location)| JobEntry::new(&spool, id, location))
        .collect();

    if args.json {
        let json = serde_json::to_string_pretty(&entries)
            .map_err(|e| anyhow::anyhow!("Failed to serialize JSON output: {}", e))?;
        println!("{}", json);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No jobs found");
        return Ok(());
    }

    println!("{:<30}Status", "Job ID");
    println!("{}", "-".repeat(50));
    for entry in &entries {
        println!("{:<30}{}", entry.id, entry.status);
    }

    Ok(())
}

async fn run_status_command(args: StatusArgs, dirs: DirArgs) -> anyhow::Result<()> {
    let spool = client_spool(&dirs)?;
    let id = JobId::new(args.job_id)?;

    let Some(location) = Results::new(spool.clone()).status(&id).await else {
        anyhow::bail!("Job {} not found", id);
    };
    let entry = JobEntry::new(&spool, id, location);

    if args.json {
        let json = serde_json::to_string_pretty(&entry)
            .map_err(|e| anyhow::anyhow!("Failed to serialize JSON output: {}", e))?;
        println!("{}", json);
        return Ok(());
    }

    println!("Job ID: {}", entry.id);
    println!("Status: {}", entry.status);
    match location {
        JobLocation::Input => println!("Job is waiting to be claimed."),
        JobLocation::Processing => println!("Job is being processed."),
        JobLocation::Output => {
            println!("Result is available. Use 'spoolq pop {}' to view.", entry.id)
        }
        JobLocation::Failed => {
            println!("Job failed. Its payload is kept at {}", entry.path.display())
        }
    }

    Ok(())
}
