//! Supervision of the external transcoder process
//!
//! At most one job runs at a time. A job moves through
//! `Idle -> Starting -> Running -> {Succeeded, Failed, Cancelled} -> Idle`;
//! whatever the outcome, the status record is back at idle before the
//! supervisor accepts the next job.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, trace, warn};

use crate::domain::errors::SupervisorError;
use crate::domain::model::*;
use crate::engine::progress::{split_lines, ProgressParser};
use crate::ports::{ProgressCallback, TranscodeObserver, TranscodePort};
use crate::utils::path::{absolutize, file_name_string, output_file_name};

/// Snapshots buffered between the output drain and the progress callback
const PROGRESS_QUEUE_CAPACITY: usize = 256;

/// How long the stdout drain may linger after the transcoder has exited
const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// How long `stop_transcoding` waits for the job to wind down
const STOP_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Default)]
struct Control {
    /// Set while a job holds the supervisor, from pre-flight to final reset
    busy: bool,
    cancel: Option<oneshot::Sender<()>>,
}

/// Owns the single transcoder subprocess and the live status record
pub struct ProcessSupervisor {
    cli_path: PathBuf,
    status: Arc<RwLock<TranscodeStatus>>,
    control: Mutex<Control>,
    state: watch::Sender<JobState>,
    observers: Vec<Arc<dyn TranscodeObserver>>,
}

enum Exit {
    Finished(std::io::Result<ExitStatus>),
    Cancelled,
}

impl Exit {
    /// Only a stop request discards what the transcoder has written
    fn removes_partial_output(&self) -> bool {
        matches!(self, Exit::Cancelled)
    }
}

impl ProcessSupervisor {
    /// Create a supervisor driving the executable at `cli_path`
    pub fn new(cli_path: impl Into<PathBuf>) -> Self {
        let (state, _) = watch::channel(JobState::Idle);
        Self {
            cli_path: cli_path.into(),
            status: Arc::new(RwLock::new(TranscodeStatus::idle())),
            control: Mutex::new(Control::default()),
            state,
            observers: Vec::new(),
        }
    }

    /// Register a lifecycle observer
    pub fn with_observer(mut self, observer: Arc<dyn TranscodeObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Watch job state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<JobState> {
        self.state.subscribe()
    }

    fn control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_status(&self, status: TranscodeStatus) {
        *self.status.write().unwrap_or_else(PoisonError::into_inner) = status;
    }

    fn set_state(&self, state: JobState) {
        self.state.send_replace(state);
    }

    fn emit(&self, event: TranscodeEvent) {
        for observer in &self.observers {
            observer.on_event(&event);
        }
    }

    /// Reserve the supervisor for one job
    fn claim(&self) -> Result<(JobSlot<'_>, oneshot::Receiver<()>), SupervisorError> {
        let mut control = self.control();
        if control.busy {
            let current = self
                .status
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .input_file
                .clone();
            return Err(SupervisorError::AlreadyRunning { current });
        }
        let (cancel_tx, cancel_rx) = oneshot::channel();
        control.busy = true;
        control.cancel = Some(cancel_tx);
        Ok((
            JobSlot {
                supervisor: self,
                partial_output: None,
            },
            cancel_rx,
        ))
    }

    /// Validate a request and resolve its absolute input and output paths
    fn preflight(&self, request: &TranscodeRequest) -> Result<(PathBuf, PathBuf), SupervisorError> {
        if !request.input_file.is_file() {
            return Err(SupervisorError::InputNotFound {
                path: request.input_file.clone(),
            });
        }

        let input = absolutize(&request.input_file).map_err(|_| SupervisorError::InputNotFound {
            path: request.input_file.clone(),
        })?;
        let output_directory = absolutize(&request.output_directory).map_err(|source| {
            SupervisorError::OutputDirectory {
                path: request.output_directory.clone(),
                source,
            }
        })?;
        let file_name = output_file_name(&input, request.output_filename.as_deref()).ok_or_else(|| {
            SupervisorError::InputNotFound {
                path: request.input_file.clone(),
            }
        })?;
        let output = output_directory.join(file_name);

        if output.exists() && !request.overwrite_existing {
            return Err(SupervisorError::OutputExists { path: output });
        }

        if !self.cli_path.is_file() {
            return Err(SupervisorError::ToolNotFound {
                path: self.cli_path.clone(),
            });
        }

        Ok((input, output))
    }

    fn build_command(&self, input: &Path, output: &Path, preset: &str) -> Command {
        let mut command = Command::new(&self.cli_path);
        command
            .arg("-i")
            .arg(input)
            .arg("-o")
            .arg(output)
            .arg("--preset")
            .arg(preset)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    async fn run_job(
        &self,
        slot: &mut JobSlot<'_>,
        mut cancel: oneshot::Receiver<()>,
        request: TranscodeRequest,
        on_progress: ProgressCallback,
    ) -> Result<TranscodeOutcome, SupervisorError> {
        let (input, output) = self.preflight(&request)?;

        if cancel.try_recv().is_ok() {
            return Err(SupervisorError::Cancelled { input });
        }

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| SupervisorError::OutputDirectory {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let input_name = file_name_string(&input);
        self.set_status(TranscodeStatus::for_job(&input, &output));
        self.set_state(JobState::Starting);
        self.emit(TranscodeEvent::Started {
            input_file: input_name.clone(),
        });
        info!(input = %input.display(), output = %output.display(), preset = %request.preset, "Starting transcode");

        let started_at = Instant::now();
        let mut child = match self.build_command(&input, &output, &request.preset).spawn() {
            Ok(child) => child,
            Err(source) => {
                self.finish(JobState::Failed);
                self.emit(TranscodeEvent::Error {
                    input_file: input_name,
                    reason: ErrorReason::StartFailed {
                        message: source.to_string(),
                    },
                });
                return Err(SupervisorError::ProcessStart { input, source });
            }
        };
        slot.partial_output = Some(output.clone());
        self.set_state(JobState::Running);

        let (progress_tx, progress_rx) = mpsc::channel(PROGRESS_QUEUE_CAPACITY);
        let callback_task = tokio::task::spawn_blocking(move || deliver_progress(progress_rx, on_progress));
        let mut stdout_task = child
            .stdout
            .take()
            .map(|stdout| tokio::spawn(drain_stdout(stdout, Arc::clone(&self.status), progress_tx)));
        let stderr_task = child.stderr.take().map(|stderr| tokio::spawn(drain_stderr(stderr)));

        let exit = tokio::select! {
            status = child.wait() => Exit::Finished(status),
            _ = &mut cancel => Exit::Cancelled,
        };

        if let Exit::Cancelled = exit {
            if let Err(err) = child.start_kill() {
                warn!(input = %input.display(), error = %err, "Failed to signal transcoder");
            }
            let _ = child.wait().await;
            if let Some(task) = stdout_task.take() {
                task.abort();
            }
        }

        if let Some(mut task) = stdout_task.take() {
            if tokio::time::timeout(DRAIN_GRACE, &mut task).await.is_err() {
                debug!(input = %input.display(), "Transcoder output still open after exit, abandoning drain");
                task.abort();
            }
        }
        if let Some(task) = stderr_task {
            task.abort();
        }
        let _ = callback_task.await;

        if !exit.removes_partial_output() {
            slot.partial_output = None;
        }

        match exit {
            Exit::Cancelled => {
                remove_partial_output(&output).await;
                slot.partial_output = None;
                self.finish(JobState::Cancelled);
                self.emit(TranscodeEvent::Cancelled {
                    input_file: input_name,
                });
                info!(input = %input.display(), "Transcode cancelled");
                Err(SupervisorError::Cancelled { input })
            }
            Exit::Finished(Err(source)) => {
                self.finish(JobState::Failed);
                self.emit(TranscodeEvent::Error {
                    input_file: input_name,
                    reason: ErrorReason::StartFailed {
                        message: source.to_string(),
                    },
                });
                Err(SupervisorError::ProcessStart { input, source })
            }
            Exit::Finished(Ok(status)) if !status.success() => {
                self.finish(JobState::Failed);
                self.emit(TranscodeEvent::Error {
                    input_file: input_name,
                    reason: ErrorReason::TranscodeFailed {
                        exit_code: status.code(),
                    },
                });
                Err(SupervisorError::TranscodeFailed {
                    input,
                    exit_code: status.code(),
                })
            }
            Exit::Finished(Ok(_)) => {
                let elapsed = started_at.elapsed();
                self.finish(JobState::Succeeded);
                self.emit(TranscodeEvent::Completed {
                    input_file: input_name.clone(),
                });
                info!(input = %input.display(), elapsed_secs = elapsed.as_secs(), "Transcode completed");

                if request.delete_source {
                    if let Err(source) = tokio::fs::remove_file(&input).await {
                        self.emit(TranscodeEvent::Error {
                            input_file: input_name,
                            reason: ErrorReason::SourceDelete {
                                message: source.to_string(),
                            },
                        });
                        return Err(SupervisorError::SourceDelete { path: input, source });
                    }
                    debug!(input = %input.display(), "Removed source");
                }

                Ok(TranscodeOutcome {
                    input_file: input,
                    output_file: output,
                    source_deleted: request.delete_source,
                    elapsed,
                })
            }
        }
    }

    /// Terminal transition: the status record returns to idle at once
    fn finish(&self, terminal: JobState) {
        self.set_status(TranscodeStatus::idle());
        self.set_state(terminal);
    }
}

#[async_trait]
impl TranscodePort for ProcessSupervisor {
    async fn transcode(
        &self,
        request: TranscodeRequest,
        on_progress: ProgressCallback,
    ) -> Result<TranscodeOutcome, SupervisorError> {
        let (mut slot, cancel) = self.claim()?;
        self.run_job(&mut slot, cancel, request, on_progress).await
    }

    async fn stop_transcoding(&self) {
        let cancel = {
            let mut control = self.control();
            if !control.busy {
                return;
            }
            control.cancel.take()
        };
        if let Some(cancel) = cancel {
            let _ = cancel.send(());
        }

        let mut state = self.state.subscribe();
        let settled = tokio::time::timeout(STOP_TIMEOUT, state.wait_for(|s| *s == JobState::Idle)).await;
        if settled.is_err() {
            warn!("Transcoder did not wind down within {:?}", STOP_TIMEOUT);
        }
    }

    fn status(&self) -> TranscodeStatus {
        self.status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn state(&self) -> JobState {
        *self.state.borrow()
    }
}

/// Reservation of the supervisor for one job.
///
/// Dropping it (normally or because the job future was dropped) returns
/// the supervisor to idle and discards any half-written output.
struct JobSlot<'a> {
    supervisor: &'a ProcessSupervisor,
    partial_output: Option<PathBuf>,
}

impl Drop for JobSlot<'_> {
    fn drop(&mut self) {
        if let Some(output) = self.partial_output.take() {
            if output.exists() {
                let _ = std::fs::remove_file(&output);
            }
        }
        self.supervisor.set_status(TranscodeStatus::idle());
        {
            let mut control = self.supervisor.control();
            control.busy = false;
            control.cancel = None;
        }
        self.supervisor.set_state(JobState::Idle);
    }
}

/// Read the transcoder's stdout, folding progress lines into the status in
/// the order they were written
async fn drain_stdout<R>(
    stdout: R,
    status: Arc<RwLock<TranscodeStatus>>,
    progress: mpsc::Sender<TranscodeStatus>,
) where
    R: AsyncRead + Unpin,
{
    let mut segments = BufReader::new(stdout).split(b'\r');
    loop {
        let segment = match segments.next_segment().await {
            Ok(Some(segment)) => segment,
            Ok(None) => break,
            Err(err) => {
                debug!(error = %err, "Transcoder stdout closed with error");
                break;
            }
        };

        let text = String::from_utf8_lossy(&segment);
        for line in split_lines(&text) {
            let Some(parsed) = ProgressParser::parse(line) else {
                continue;
            };
            let snapshot = {
                let mut status = status.write().unwrap_or_else(PoisonError::into_inner);
                status.apply(&parsed);
                status.clone()
            };
            if let Err(mpsc::error::TrySendError::Full(_)) = progress.try_send(snapshot) {
                trace!("Progress consumer lagging, dropped a snapshot");
            }
        }
    }
}

async fn drain_stderr<R>(stderr: R)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if !line.trim().is_empty() {
            debug!(target: "hbsched::handbrake", "{}", line);
        }
    }
}

fn deliver_progress(mut progress: mpsc::Receiver<TranscodeStatus>, on_progress: ProgressCallback) {
    while let Some(snapshot) = progress.blocking_recv() {
        on_progress(&snapshot);
    }
}

async fn remove_partial_output(output: &Path) {
    if tokio::fs::try_exists(output).await.unwrap_or(false) {
        if let Err(err) = tokio::fs::remove_file(output).await {
            debug!(output = %output.display(), error = %err, "Could not remove partial output");
        }
    }
}
