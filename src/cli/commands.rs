//! Command implementations

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::app::batch_walker::{enumerate_folder, BatchReport, BatchStop};
use crate::app::container::AppContainer;
use crate::cli::args::{CheckArgs, RunArgs, TranscodeArgs};
use crate::cli::Commands;
use crate::domain::model::{Settings, TranscodeRequest};

/// Execute a transcoding command.
///
/// `check` is handled separately by [`check`], since it runs before strays are reaped.
pub async fn execute(
    container: Arc<dyn AppContainer>,
    settings: Settings,
    command: Commands,
) -> Result<()> {
    match command {
        Commands::Run(args) => run(container.as_ref(), &settings, args).await.map(|_| ()),
        Commands::Transcode(args) => transcode(container.as_ref(), args).await,
        Commands::Check(args) => check(container.as_ref(), &settings, args),
    }
}

/// Execute the batch over every configured folder
pub async fn run(container: &dyn AppContainer, settings: &Settings, args: RunArgs) -> Result<BatchReport> {
    if settings.handbrake.folders.is_empty() {
        warn!("No folders configured, nothing to do");
    }
    if args.scheduled && settings.schedule.bounds().is_none() {
        warn!("Scheduled run without a complete time window, the batch will not be cut off");
    }

    let report = container
        .batch_walker()
        .run(&settings.handbrake.folders, &settings.schedule, args.scheduled)
        .await;

    match report.stop {
        BatchStop::Completed => info!("All folders processed"),
        BatchStop::WindowClosed => info!("Stopped at the end of the scheduled window"),
        BatchStop::Cancelled => warn!("Batch cancelled"),
    }
    Ok(report)
}

/// Execute the single-file transcode command
pub async fn transcode(container: &dyn AppContainer, args: TranscodeArgs) -> Result<()> {
    info!(input = %args.input.display(), output_dir = %args.output_dir.display(), preset = %args.preset, "Starting transcode");

    let mut request = TranscodeRequest::new(args.input.clone(), args.output_dir, args.preset)
        .overwrite_existing(!args.no_overwrite)
        .delete_source(args.delete_source);
    if let Some(name) = args.output_name {
        request = request.with_output_filename(name);
    }

    let outcome = container
        .batch_walker()
        .transcode_file(request)
        .await
        .with_context(|| format!("Failed to transcode '{}'", args.input.display()))?;

    info!(
        output = %outcome.output_file.display(),
        elapsed_secs = outcome.elapsed.as_secs(),
        source_deleted = outcome.source_deleted,
        "Transcode completed"
    );
    Ok(())
}

#[derive(Debug, Serialize)]
struct CheckReport {
    cli_path: String,
    cli_path_exists: bool,
    process_name: String,
    strays_terminated: usize,
    schedule_enabled: bool,
    schedule_window: Option<String>,
    folders: Vec<FolderReport>,
}

#[derive(Debug, Serialize)]
struct FolderReport {
    input_path: String,
    output_path: String,
    preset: String,
    candidate_files: Option<usize>,
    error: Option<String>,
}

/// Execute the check command: validate, reconcile strays, report
pub fn check(container: &dyn AppContainer, settings: &Settings, args: CheckArgs) -> Result<()> {
    let process_name = settings.handbrake.effective_process_name();
    let strays_terminated = container.reaper().reap(&process_name);

    let folders = settings
        .handbrake
        .folders
        .iter()
        .map(|folder| {
            let (candidate_files, error) = match enumerate_folder(folder) {
                Ok(files) => (Some(files.len()), None),
                Err(err) => (None, Some(err.to_string())),
            };
            FolderReport {
                input_path: folder.input_path.display().to_string(),
                output_path: folder.output_path.display().to_string(),
                preset: folder.preset.clone(),
                candidate_files,
                error,
            }
        })
        .collect();

    let report = CheckReport {
        cli_path: settings.handbrake.cli_path.display().to_string(),
        cli_path_exists: settings.handbrake.cli_path.is_file(),
        process_name,
        strays_terminated,
        schedule_enabled: settings.schedule.enabled,
        schedule_window: settings
            .schedule
            .bounds()
            .map(|(start, end)| format!("{} - {}", start, end)),
        folders,
    };

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize check report")?;
        println!("{}", json);
    } else {
        print_report(&report);
    }

    if !report.cli_path_exists {
        warn!(path = %report.cli_path, "Transcoder executable not found");
    }
    Ok(())
}

fn print_report(report: &CheckReport) {
    println!("Transcoder: {}{}", report.cli_path, if report.cli_path_exists { "" } else { " (missing)" });
    println!("Process name: {}", report.process_name);
    println!("Stray processes terminated: {}", report.strays_terminated);
    match (&report.schedule_window, report.schedule_enabled) {
        (Some(window), true) => println!("Schedule: {}", window),
        (None, true) => println!("Schedule: enabled, no end time"),
        (_, false) => println!("Schedule: disabled"),
    }
    println!("Folders: {}", report.folders.len());
    for folder in &report.folders {
        match (&folder.candidate_files, &folder.error) {
            (Some(count), _) => println!(
                "  {} -> {} [{}] {} file(s)",
                folder.input_path, folder.output_path, folder.preset, count
            ),
            (None, Some(error)) => println!("  {} -> {} ERROR: {}", folder.input_path, folder.output_path, error),
            (None, None) => println!("  {} -> {}", folder.input_path, folder.output_path),
        }
    }
}
