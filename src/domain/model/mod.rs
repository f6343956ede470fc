// Domain models - Core types and data structures

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::utils::path::file_name_string;
use crate::utils::time::{format_eta, time_of_day_opt};

#[cfg(test)]
mod tests;

/// Live description of the current (or absent) transcode job.
///
/// One instance lives for the whole program; the supervisor is its only
/// writer and readers receive clones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscodeStatus {
    /// Whether a transcoder process is running at the moment
    pub converting: bool,
    /// Basename of the current input, empty when idle
    pub input_file: String,
    /// Basename of the current output, empty when idle
    pub output_file: String,
    /// Last reported completion in percent, 0..=100
    pub percentage: f32,
    /// Last reported instantaneous throughput
    pub current_fps: f32,
    /// Last reported average throughput
    pub average_fps: f32,
    /// Last reported time remaining
    pub estimated: Duration,
}

impl Default for TranscodeStatus {
    fn default() -> Self {
        Self::idle()
    }
}

impl TranscodeStatus {
    /// Status with no job
    pub fn idle() -> Self {
        Self {
            converting: false,
            input_file: String::new(),
            output_file: String::new(),
            percentage: 0.0,
            current_fps: 0.0,
            average_fps: 0.0,
            estimated: Duration::ZERO,
        }
    }

    /// Fresh status for a job that is about to start
    pub fn for_job(input: &Path, output: &Path) -> Self {
        Self {
            converting: true,
            input_file: file_name_string(input),
            output_file: file_name_string(output),
            ..Self::idle()
        }
    }

    /// Apply one parsed progress line.
    ///
    /// Percentage always updates. Throughput and ETA only move together, when
    /// the line carried its detail group.
    pub fn apply(&mut self, line: &ProgressLine) {
        self.percentage = line.percentage;
        if let Some(detail) = &line.detail {
            self.current_fps = detail.current_fps;
            self.average_fps = detail.average_fps;
            self.estimated = detail.eta;
        }
    }
}

impl fmt::Display for TranscodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.converting {
            return write!(f, "Idle");
        }
        write!(
            f,
            "{} -> {} - {:.2}%  {:.2} fps.  {:.2} fps. avg.  {} time remaining",
            self.input_file,
            self.output_file,
            self.percentage,
            self.current_fps,
            self.average_fps,
            format_eta(self.estimated)
        )
    }
}

/// One parsed status line from the transcoder
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressLine {
    pub percentage: f32,
    /// Present only when the line carried the bracketed detail group
    pub detail: Option<ProgressDetail>,
}

/// Throughput and ETA portion of a progress line
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressDetail {
    pub current_fps: f32,
    pub average_fps: f32,
    pub eta: Duration,
}

/// Supervisor job state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Starting,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobState {
    /// Whether a job currently holds the supervisor
    pub fn is_active(&self) -> bool {
        matches!(self, JobState::Starting | JobState::Running)
    }
}

/// Why an error event was raised
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorReason {
    /// The transcoder exited unsuccessfully
    TranscodeFailed { exit_code: Option<i32> },
    /// The transcoder could not be launched
    StartFailed { message: String },
    /// The output was produced but the source could not be removed
    SourceDelete { message: String },
}

/// Lifecycle notifications surfaced to observers
#[derive(Debug, Clone, PartialEq)]
pub enum TranscodeEvent {
    Started { input_file: String },
    Completed { input_file: String },
    Error { input_file: String, reason: ErrorReason },
    Cancelled { input_file: String },
}

impl TranscodeEvent {
    /// Input file name the event concerns
    pub fn input_file(&self) -> &str {
        match self {
            TranscodeEvent::Started { input_file }
            | TranscodeEvent::Completed { input_file }
            | TranscodeEvent::Error { input_file, .. }
            | TranscodeEvent::Cancelled { input_file } => input_file,
        }
    }
}

/// Parameters of one transcode job
#[derive(Debug, Clone)]
pub struct TranscodeRequest {
    pub input_file: PathBuf,
    pub output_directory: PathBuf,
    /// Explicit output name; derived from the input when absent
    pub output_filename: Option<String>,
    pub preset: String,
    pub overwrite_existing: bool,
    pub delete_source: bool,
}

impl TranscodeRequest {
    /// Request that overwrites an existing output and deletes the source
    pub fn new(
        input_file: impl Into<PathBuf>,
        output_directory: impl Into<PathBuf>,
        preset: impl Into<String>,
    ) -> Self {
        Self {
            input_file: input_file.into(),
            output_directory: output_directory.into(),
            output_filename: None,
            preset: preset.into(),
            overwrite_existing: true,
            delete_source: true,
        }
    }

    pub fn with_output_filename(mut self, name: impl Into<String>) -> Self {
        self.output_filename = Some(name.into());
        self
    }

    pub fn overwrite_existing(mut self, overwrite: bool) -> Self {
        self.overwrite_existing = overwrite;
        self
    }

    pub fn delete_source(mut self, delete: bool) -> Self {
        self.delete_source = delete;
        self
    }
}

/// Result of a successful transcode
#[derive(Debug, Clone)]
pub struct TranscodeOutcome {
    pub input_file: PathBuf,
    pub output_file: PathBuf,
    pub source_deleted: bool,
    pub elapsed: Duration,
}

/// Root of the settings file
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub handbrake: HandBrakeSettings,
    #[serde(default)]
    pub schedule: ScheduleWindow,
    #[serde(default)]
    pub batch: BatchSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    /// Defaults with no folders, used when no settings file exists
    pub fn for_cli_path(cli_path: impl Into<PathBuf>) -> Self {
        Self {
            handbrake: HandBrakeSettings {
                cli_path: cli_path.into(),
                process_name: None,
                folders: Vec::new(),
            },
            schedule: ScheduleWindow::default(),
            batch: BatchSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Transcoder location and the folders it works on
#[derive(Debug, Clone, Deserialize)]
pub struct HandBrakeSettings {
    pub cli_path: PathBuf,
    /// Process name used to find stray instances; defaults to the stem of `cli_path`
    #[serde(default)]
    pub process_name: Option<String>,
    #[serde(default)]
    pub folders: Vec<FolderSetting>,
}

impl HandBrakeSettings {
    /// Name stray transcoder processes are matched by
    pub fn effective_process_name(&self) -> String {
        self.process_name.clone().unwrap_or_else(|| {
            self.cli_path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "HandBrakeCLI".to_string())
        })
    }
}

/// One watched input folder
#[derive(Debug, Clone, Deserialize)]
pub struct FolderSetting {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    #[serde(default = "default_preset")]
    pub preset: String,
    #[serde(default = "default_true")]
    pub preserve_folder_structure: bool,
    #[serde(default = "default_true")]
    pub delete_source: bool,
    #[serde(default = "default_true")]
    pub overwrite_existing: bool,
    pub file_extensions: BTreeSet<String>,
}

fn default_preset() -> String {
    "HQ 1080p30 Surround".to_string()
}

fn default_true() -> bool {
    true
}

/// Daily window scheduled runs may keep working in
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScheduleWindow {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, deserialize_with = "time_of_day_opt")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, deserialize_with = "time_of_day_opt")]
    pub end_time: Option<NaiveTime>,
}

impl ScheduleWindow {
    /// Both bounds, when the window is fully specified
    pub fn bounds(&self) -> Option<(NaiveTime, NaiveTime)> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }
}

/// How far one failing file propagates inside its folder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// The rest of the folder is abandoned
    #[default]
    AbortFolder,
    /// Only the failing file is skipped
    SkipFile,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchSettings {
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// Also append log events to this file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
