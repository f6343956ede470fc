// Ports - Interface definitions (contracts)

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Callback receiving a status snapshot after every parsed progress line
pub type ProgressCallback = Arc<dyn Fn(&TranscodeStatus) + Send + Sync>;

/// Port for running one transcode at a time
#[async_trait]
pub trait TranscodePort: Send + Sync {
    /// Transcode one file, invoking `on_progress` with status snapshots
    async fn transcode(
        &self,
        request: TranscodeRequest,
        on_progress: ProgressCallback,
    ) -> Result<TranscodeOutcome, SupervisorError>;

    /// Terminate the running job and remove its partial output; no-op when idle
    async fn stop_transcoding(&self);

    /// Snapshot of the live status record
    fn status(&self) -> TranscodeStatus;

    /// Current job state
    fn state(&self) -> JobState;
}

/// Observer for transcode lifecycle events
pub trait TranscodeObserver: Send + Sync {
    fn on_event(&self, event: &TranscodeEvent);
}

/// External progress display, one handle per file
pub trait ProgressReporter: Send + Sync {
    /// Called before a file starts; the returned callback receives its progress
    fn file_started(&self, input: &Path) -> ProgressCallback;

    /// Called once the file is finished, whatever the outcome
    fn file_finished(&self, input: &Path, success: bool);
}

/// Port for finding and terminating stray transcoder processes
pub trait ProcessReaperPort: Send + Sync {
    /// Terminate every process named `name`, returning how many were signalled
    fn reap(&self, name: &str) -> usize;
}

/// Port for local wall-clock time
pub trait ClockPort: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Port for configuration management
#[async_trait]
pub trait ConfigPort: Send + Sync {
    /// Load settings from a file
    async fn load_settings(&self, file_path: &Path) -> Result<Settings, ConfigError>;

    /// Validate loaded settings
    fn validate(&self, settings: &Settings) -> Result<(), ConfigError>;
}
