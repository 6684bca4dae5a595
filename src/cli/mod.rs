//! Command-line interface for spoolq.
//!
//! Provides the `serve` command that runs the worker pool, and the `push`,
//! `pop`, `list` and `status` client commands.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli};
