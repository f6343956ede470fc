// Domain errors - Error types for the domain layer

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification of a supervisor failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rejected before any work was done; only this file fails
    Preflight,
    /// The transcoder could not be launched
    Start,
    /// The transcoder ran and exited unsuccessfully
    Failed,
    /// The transcode succeeded but post-success cleanup did not
    Cleanup,
    /// The job was stopped on request
    Cancelled,
}

/// Errors raised by the process supervisor
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// Input file not found
    #[error("input file '{}' could not be found", .path.display())]
    InputNotFound { path: PathBuf },

    /// Another transcode is in progress
    #[error("a transcode is already running ({current})")]
    AlreadyRunning { current: String },

    /// Transcoder executable missing at the configured path
    #[error("no transcoder executable found at '{}'", .path.display())]
    ToolNotFound { path: PathBuf },

    /// Output exists and overwriting was not requested
    #[error("output '{}' already exists, enable overwrite to replace it", .path.display())]
    OutputExists { path: PathBuf },

    /// The output directory could not be created
    #[error("could not create output directory '{}'", .path.display())]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The subprocess could not be started or awaited
    #[error("failed to run transcoder for '{}'", .input.display())]
    ProcessStart {
        input: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The subprocess exited with a non-zero status
    #[error("transcoder exited with {} for '{}'", exit_label(.exit_code), .input.display())]
    TranscodeFailed {
        input: PathBuf,
        exit_code: Option<i32>,
    },

    /// The source could not be removed after a successful transcode
    #[error("could not remove original '{}'", .path.display())]
    SourceDelete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The job was stopped before the transcoder finished
    #[error("transcode of '{}' was cancelled", .input.display())]
    Cancelled { input: PathBuf },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl SupervisorError {
    /// Category used by callers to decide how far a failure propagates
    pub fn category(&self) -> ErrorCategory {
        match self {
            SupervisorError::InputNotFound { .. }
            | SupervisorError::AlreadyRunning { .. }
            | SupervisorError::ToolNotFound { .. }
            | SupervisorError::OutputExists { .. }
            | SupervisorError::OutputDirectory { .. } => ErrorCategory::Preflight,
            SupervisorError::ProcessStart { .. } => ErrorCategory::Start,
            SupervisorError::TranscodeFailed { .. } => ErrorCategory::Failed,
            SupervisorError::SourceDelete { .. } => ErrorCategory::Cleanup,
            SupervisorError::Cancelled { .. } => ErrorCategory::Cancelled,
        }
    }

    /// False for cleanup problems after a good transcode and for stop requests
    pub fn is_transcode_failure(&self) -> bool {
        !matches!(
            self.category(),
            ErrorCategory::Cleanup | ErrorCategory::Cancelled
        )
    }
}

/// Error raised while walking or processing one configured folder
#[derive(Error, Debug)]
pub enum FolderProcessingError {
    #[error("failed to enumerate folder '{}'", .folder.display())]
    Walk {
        folder: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("input folder '{}' does not exist", .folder.display())]
    MissingFolder { folder: PathBuf },

    #[error("failed to process '{}' in folder '{}'", .file.display(), .folder.display())]
    Transcode {
        folder: PathBuf,
        file: PathBuf,
        #[source]
        source: SupervisorError,
    },
}

impl FolderProcessingError {
    /// Folder the failure belongs to
    pub fn folder(&self) -> &PathBuf {
        match self {
            FolderProcessingError::Walk { folder, .. }
            | FolderProcessingError::MissingFolder { folder }
            | FolderProcessingError::Transcode { folder, .. } => folder,
        }
    }
}

/// Errors raised while loading or validating settings
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read settings file '{}'", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse settings file '{}'", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid time of day '{0}', expected HH:MM or HH:MM:SS")]
    InvalidTimeOfDay(String),

    #[error("invalid settings: {0}")]
    Invalid(String),
}
