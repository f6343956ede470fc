//! CLI module for hbsched
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

pub use args::{CheckArgs, RunArgs, TranscodeArgs};

/// hbsched - scheduled HandBrakeCLI batch transcoder
///
/// Walks the configured folders and transcodes every matching file, one at a
/// time. Scheduled runs stop once the daily window has closed.
#[derive(Parser, Debug)]
#[command(name = "hbsched")]
#[command(about = "Scheduled batch transcoding with HandBrakeCLI")]
#[command(version)]
pub struct Cli {
    /// Settings file
    #[arg(long, env = "HBSCHED_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Logging level or filter directive
    #[arg(long, env = "HBSCHED_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Path to the HandBrakeCLI executable
    #[arg(long, env = "HBSCHED_CLI_PATH", global = true)]
    pub cli_path: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Transcode every configured folder
    Run(RunArgs),
    /// Transcode a single file
    Transcode(TranscodeArgs),
    /// Validate settings and clean up stray transcoders
    Check(CheckArgs),
}
