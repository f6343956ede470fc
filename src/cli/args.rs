//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

/// Arguments for the run command
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Invoked by the daily scheduler; enables the time window cutoff
    #[arg(short, long)]
    pub scheduled: bool,
}

/// Arguments for the transcode command
#[derive(Args, Debug, Clone)]
pub struct TranscodeArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory the output is written to
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// HandBrake preset name
    #[arg(long, default_value = "HQ 1080p30 Surround")]
    pub preset: String,

    /// Output file name (default: input name with .mp4)
    #[arg(long)]
    pub output_name: Option<String>,

    /// Fail instead of replacing an existing output
    #[arg(long)]
    pub no_overwrite: bool,

    /// Remove the input after a successful transcode
    #[arg(long)]
    pub delete_source: bool,
}

/// Arguments for the check command
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
