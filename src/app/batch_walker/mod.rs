// Batch walker - Drives the supervisor over every configured folder

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::ports::*;
use crate::utils::path::{has_allowed_extension, nested_output_directory, normalize_extension};

#[cfg(test)]
mod tests;

/// Why a batch run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStop {
    /// Every folder was visited
    Completed,
    /// A scheduled run passed its daily cutoff
    WindowClosed,
    /// A transcode was stopped on request
    Cancelled,
}

/// Summary of one batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub stop: BatchStop,
    pub transcoded: usize,
    pub failed: usize,
    /// Folders abandoned because of an enumeration or processing error
    pub folders_skipped: usize,
}

impl BatchReport {
    fn new() -> Self {
        Self {
            stop: BatchStop::Completed,
            transcoded: 0,
            failed: 0,
            folders_skipped: 0,
        }
    }
}

enum FolderFlow {
    Continue,
    Halt(BatchStop),
}

/// Shared stop request for a batch.
///
/// Once set it stays set; the walker checks it before every folder and file
/// and stops the running transcode when it flips.
#[derive(Clone)]
pub struct StopHandle {
    requested: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn new() -> Self {
        let (requested, _) = watch::channel(false);
        Self {
            requested: Arc::new(requested),
        }
    }

    pub fn request_stop(&self) {
        self.requested.send_replace(true);
    }

    pub fn is_stop_requested(&self) -> bool {
        *self.requested.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.requested.subscribe()
    }
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Sequential batch over the configured folders
pub struct BatchWalker {
    transcoder: Arc<dyn TranscodePort>,
    clock: Arc<dyn ClockPort>,
    reporter: Arc<dyn ProgressReporter>,
    failure_policy: FailurePolicy,
    stop: StopHandle,
}

impl BatchWalker {
    pub fn new(
        transcoder: Arc<dyn TranscodePort>,
        clock: Arc<dyn ClockPort>,
        reporter: Arc<dyn ProgressReporter>,
        failure_policy: FailurePolicy,
    ) -> Self {
        Self {
            transcoder,
            clock,
            reporter,
            failure_policy,
            stop: StopHandle::new(),
        }
    }

    /// Share an existing stop request instead of a private one
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    /// Handle that ends this walker's batch and its running transcode
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Process every folder in order.
    ///
    /// The run start is captured once; with `scheduled` set the daily window
    /// is checked after each processed file and may end the whole batch.
    pub async fn run(
        &self,
        folders: &[FolderSetting],
        window: &ScheduleWindow,
        scheduled: bool,
    ) -> BatchReport {
        let run_start = self.clock.now();
        let mut report = BatchReport::new();
        info!(folders = folders.len(), scheduled, "Starting batch");

        for folder in folders {
            if self.stop.is_stop_requested() {
                report.stop = BatchStop::Cancelled;
                break;
            }
            match self
                .process_folder(folder, window, scheduled, run_start, &mut report)
                .await
            {
                Ok(FolderFlow::Continue) => {}
                Ok(FolderFlow::Halt(stop)) => {
                    report.stop = stop;
                    break;
                }
                Err(err) => {
                    report.folders_skipped += 1;
                    error!(
                        folder = %err.folder().display(),
                        error = %error_chain(&err),
                        "Skipping rest of folder"
                    );
                }
            }
        }

        info!(
            stop = ?report.stop,
            transcoded = report.transcoded,
            failed = report.failed,
            folders_skipped = report.folders_skipped,
            "Batch finished"
        );
        report
    }

    /// Transcode one file with the console progress sink attached.
    ///
    /// A stop request arriving while the job runs stops the transcoder; one
    /// made before the call means nothing is started.
    pub async fn transcode_file(
        &self,
        request: TranscodeRequest,
    ) -> Result<TranscodeOutcome, SupervisorError> {
        let input = request.input_file.clone();
        if self.stop.is_stop_requested() {
            return Err(SupervisorError::Cancelled { input });
        }

        let on_progress = self.reporter.file_started(&input);
        let mut stop = self.stop.subscribe();
        let job = self.transcoder.transcode(request, on_progress);
        tokio::pin!(job);

        let stop_requested = async {
            let _ = stop.wait_for(|requested| *requested).await;
        };
        let finished = tokio::select! {
            biased;
            result = &mut job => Some(result),
            _ = stop_requested => None,
        };
        let result = match finished {
            Some(result) => result,
            None => {
                info!(input = %input.display(), "Stop requested, stopping transcoder");
                let (result, ()) = tokio::join!(job, self.transcoder.stop_transcoding());
                result
            }
        };

        self.reporter.file_finished(&input, result.is_ok());
        result
    }

    async fn process_folder(
        &self,
        folder: &FolderSetting,
        window: &ScheduleWindow,
        scheduled: bool,
        run_start: chrono::NaiveDateTime,
        report: &mut BatchReport,
    ) -> Result<FolderFlow, FolderProcessingError> {
        let files = enumerate_folder(folder)?;
        info!(folder = %folder.input_path.display(), files = files.len(), "Processing folder");

        for file in files {
            if self.stop.is_stop_requested() {
                info!(folder = %folder.input_path.display(), "Batch stopped");
                return Ok(FolderFlow::Halt(BatchStop::Cancelled));
            }
            let output_directory = nested_output_directory(
                &file,
                &folder.input_path,
                &folder.output_path,
                folder.preserve_folder_structure,
            );
            let request = TranscodeRequest::new(file.clone(), output_directory, folder.preset.clone())
                .overwrite_existing(folder.overwrite_existing)
                .delete_source(folder.delete_source);

            match self.transcode_file(request).await {
                Ok(_) => report.transcoded += 1,
                Err(err) => match FailureBoundary::after_error(self.failure_policy, &err) {
                    FileFlow::NextFile => {
                        if err.is_transcode_failure() {
                            report.failed += 1;
                        } else {
                            report.transcoded += 1;
                        }
                        warn!(file = %file.display(), error = %error_chain(&err), "Continuing with next file");
                    }
                    FileFlow::AbortFolder => {
                        report.failed += 1;
                        return Err(FolderProcessingError::Transcode {
                            folder: folder.input_path.clone(),
                            file,
                            source: err,
                        });
                    }
                    FileFlow::HaltBatch => {
                        info!(file = %file.display(), "Batch stopped");
                        return Ok(FolderFlow::Halt(BatchStop::Cancelled));
                    }
                },
            }

            let now = self.clock.now();
            if TimeWindowPolicy::check(window, scheduled, run_start, now) == WindowDecision::Stop {
                info!(now = %now, "Scheduled window has closed, stopping batch");
                return Ok(FolderFlow::Halt(BatchStop::WindowClosed));
            }
        }

        Ok(FolderFlow::Continue)
    }
}

/// Candidate files under a folder, recursively, in file name order
pub fn enumerate_folder(folder: &FolderSetting) -> Result<Vec<PathBuf>, FolderProcessingError> {
    let root = folder.input_path.as_path();
    if !root.is_dir() {
        return Err(FolderProcessingError::MissingFolder {
            folder: root.to_path_buf(),
        });
    }

    let allowed: Vec<String> = folder
        .file_extensions
        .iter()
        .map(|ext| normalize_extension(ext))
        .collect();

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| FolderProcessingError::Walk {
            folder: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && has_allowed_extension(entry.path(), &allowed) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn error_chain(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
