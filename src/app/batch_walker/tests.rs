// Unit tests for the batch walker

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, VecDeque};
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use tempfile::TempDir;
    use tokio::sync::Notify;

    use crate::app::batch_walker::*;

    type Script = Box<dyn Fn(&TranscodeRequest) -> Result<(), SupervisorError> + Send + Sync>;

    struct FakeTranscoder {
        calls: Mutex<Vec<TranscodeRequest>>,
        script: Script,
    }

    impl FakeTranscoder {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                script,
            })
        }

        fn succeeding() -> Arc<Self> {
            Self::new(Box::new(|_| Ok(())))
        }

        fn inputs(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|request| {
                    request
                        .input_file
                        .file_name()
                        .unwrap()
                        .to_string_lossy()
                        .into_owned()
                })
                .collect()
        }
    }

    #[async_trait]
    impl TranscodePort for FakeTranscoder {
        async fn transcode(
            &self,
            request: TranscodeRequest,
            on_progress: ProgressCallback,
        ) -> Result<TranscodeOutcome, SupervisorError> {
            self.calls.lock().unwrap().push(request.clone());
            (self.script)(&request)?;
            on_progress(&TranscodeStatus::idle());
            Ok(TranscodeOutcome {
                input_file: request.input_file.clone(),
                output_file: request.output_directory.join("out.mp4"),
                source_deleted: request.delete_source,
                elapsed: Duration::ZERO,
            })
        }

        async fn stop_transcoding(&self) {}

        fn status(&self) -> TranscodeStatus {
            TranscodeStatus::idle()
        }

        fn state(&self) -> JobState {
            JobState::Idle
        }
    }

    /// Returns the queued instants in order, then repeats the last one
    struct FakeClock {
        times: Mutex<VecDeque<NaiveDateTime>>,
        last: Mutex<NaiveDateTime>,
    }

    impl FakeClock {
        fn new(times: Vec<NaiveDateTime>) -> Arc<Self> {
            let last = times[0];
            Arc::new(Self {
                times: Mutex::new(times.into()),
                last: Mutex::new(last),
            })
        }
    }

    impl ClockPort for FakeClock {
        fn now(&self) -> NaiveDateTime {
            let mut last = self.last.lock().unwrap();
            if let Some(next) = self.times.lock().unwrap().pop_front() {
                *last = next;
            }
            *last
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        finished: Mutex<Vec<(PathBuf, bool)>>,
    }

    impl ProgressReporter for RecordingReporter {
        fn file_started(&self, _input: &Path) -> ProgressCallback {
            Arc::new(|_| {})
        }

        fn file_finished(&self, input: &Path, success: bool) {
            self.finished
                .lock()
                .unwrap()
                .push((input.to_path_buf(), success));
        }
    }

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"video").unwrap();
    }

    fn folder(input: &Path, output: &Path, extensions: &[&str]) -> FolderSetting {
        FolderSetting {
            input_path: input.to_path_buf(),
            output_path: output.to_path_buf(),
            preset: "Fast 1080p30".to_string(),
            preserve_folder_structure: true,
            delete_source: false,
            overwrite_existing: true,
            file_extensions: extensions.iter().map(|ext| ext.to_string()).collect::<BTreeSet<_>>(),
        }
    }

    fn walker(
        transcoder: Arc<FakeTranscoder>,
        clock: Arc<FakeClock>,
        policy: FailurePolicy,
    ) -> BatchWalker {
        BatchWalker::new(transcoder, clock, Arc::new(RecordingReporter::default()), policy)
    }

    fn night_window() -> ScheduleWindow {
        ScheduleWindow {
            enabled: true,
            start_time: NaiveTime::from_hms_opt(22, 0, 0),
            end_time: NaiveTime::from_hms_opt(6, 0, 0),
        }
    }

    fn failing_on(name: &'static str) -> Script {
        Box::new(move |request| {
            if request.input_file.ends_with(name) {
                Err(SupervisorError::TranscodeFailed {
                    input: request.input_file.clone(),
                    exit_code: Some(3),
                })
            } else {
                Ok(())
            }
        })
    }

    #[test]
    fn test_enumerate_folder_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("in");
        touch(&root.join("b.mkv"));
        touch(&root.join("a.MKV"));
        touch(&root.join("nested/c.avi"));
        touch(&root.join("notes.txt"));

        let files = enumerate_folder(&folder(&root, &dir.path().join("out"), &[".mkv", "AVI"])).unwrap();
        let relative: Vec<_> = files
            .iter()
            .map(|file| file.strip_prefix(&root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            vec![
                PathBuf::from("a.MKV"),
                PathBuf::from("b.mkv"),
                PathBuf::from("nested/c.avi"),
            ]
        );
    }

    #[test]
    fn test_enumerate_missing_folder() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        let err = enumerate_folder(&folder(&missing, dir.path(), &["mkv"])).unwrap_err();
        assert!(matches!(err, FolderProcessingError::MissingFolder { .. }));
        assert_eq!(err.folder(), &missing);
    }

    #[tokio::test]
    async fn test_run_mirrors_structure() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("in");
        let out = dir.path().join("out");
        touch(&root.join("a.mkv"));
        touch(&root.join("season1/b.mkv"));

        let transcoder = FakeTranscoder::succeeding();
        let batch = walker(transcoder.clone(), FakeClock::new(vec![at(1, 23, 0)]), FailurePolicy::AbortFolder);
        let report = batch
            .run(&[folder(&root, &out, &["mkv"])], &ScheduleWindow::default(), false)
            .await;

        assert_eq!(report.stop, BatchStop::Completed);
        assert_eq!(report.transcoded, 2);
        let calls = transcoder.calls.lock().unwrap();
        assert_eq!(calls[0].output_directory, out);
        assert_eq!(calls[1].output_directory, out.join("season1"));
        assert_eq!(calls[1].preset, "Fast 1080p30");
        assert!(calls[1].overwrite_existing);
        assert!(!calls[1].delete_source);
    }

    #[tokio::test]
    async fn test_failure_aborts_rest_of_folder_only() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        for name in ["a.mkv", "b.mkv", "c.mkv"] {
            touch(&first.join(name));
        }
        touch(&second.join("d.mkv"));

        let transcoder = FakeTranscoder::new(failing_on("b.mkv"));
        let batch = walker(transcoder.clone(), FakeClock::new(vec![at(1, 23, 0)]), FailurePolicy::AbortFolder);
        let folders = [
            folder(&first, &dir.path().join("out1"), &["mkv"]),
            folder(&second, &dir.path().join("out2"), &["mkv"]),
        ];
        let report = batch.run(&folders, &ScheduleWindow::default(), false).await;

        assert_eq!(transcoder.inputs(), vec!["a.mkv", "b.mkv", "d.mkv"]);
        assert_eq!(report.transcoded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.folders_skipped, 1);
        assert_eq!(report.stop, BatchStop::Completed);
    }

    #[tokio::test]
    async fn test_skip_file_policy_continues_folder() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("in");
        for name in ["a.mkv", "b.mkv", "c.mkv"] {
            touch(&root.join(name));
        }

        let transcoder = FakeTranscoder::new(failing_on("b.mkv"));
        let batch = walker(transcoder.clone(), FakeClock::new(vec![at(1, 23, 0)]), FailurePolicy::SkipFile);
        let report = batch
            .run(&[folder(&root, &dir.path().join("out"), &["mkv"])], &ScheduleWindow::default(), false)
            .await;

        assert_eq!(transcoder.inputs(), vec!["a.mkv", "b.mkv", "c.mkv"]);
        assert_eq!(report.transcoded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.folders_skipped, 0);
    }

    #[tokio::test]
    async fn test_source_delete_failure_does_not_abort_folder() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("in");
        touch(&root.join("a.mkv"));
        touch(&root.join("b.mkv"));

        let transcoder = FakeTranscoder::new(Box::new(|request| {
            if request.input_file.ends_with("a.mkv") {
                Err(SupervisorError::SourceDelete {
                    path: request.input_file.clone(),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked"),
                })
            } else {
                Ok(())
            }
        }));
        let batch = walker(transcoder.clone(), FakeClock::new(vec![at(1, 23, 0)]), FailurePolicy::AbortFolder);
        let report = batch
            .run(&[folder(&root, &dir.path().join("out"), &["mkv"])], &ScheduleWindow::default(), false)
            .await;

        assert_eq!(transcoder.inputs(), vec!["a.mkv", "b.mkv"]);
        assert_eq!(report.transcoded, 2);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn test_cancellation_halts_whole_batch() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        touch(&first.join("a.mkv"));
        touch(&first.join("b.mkv"));
        touch(&second.join("c.mkv"));

        let transcoder = FakeTranscoder::new(Box::new(|request| {
            Err(SupervisorError::Cancelled {
                input: request.input_file.clone(),
            })
        }));
        let batch = walker(transcoder.clone(), FakeClock::new(vec![at(1, 23, 0)]), FailurePolicy::SkipFile);
        let folders = [
            folder(&first, &dir.path().join("out1"), &["mkv"]),
            folder(&second, &dir.path().join("out2"), &["mkv"]),
        ];
        let report = batch.run(&folders, &ScheduleWindow::default(), false).await;

        assert_eq!(transcoder.inputs(), vec!["a.mkv"]);
        assert_eq!(report.stop, BatchStop::Cancelled);
    }

    #[tokio::test]
    async fn test_scheduled_run_stops_after_cutoff() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        touch(&first.join("a.mkv"));
        touch(&first.join("b.mkv"));
        touch(&second.join("c.mkv"));

        // run starts 23:00, first file ends 05:59 next day, second at 06:01
        let clock = FakeClock::new(vec![at(1, 23, 0), at(2, 5, 59), at(2, 6, 1)]);
        let transcoder = FakeTranscoder::succeeding();
        let batch = walker(transcoder.clone(), clock, FailurePolicy::AbortFolder);
        let folders = [
            folder(&first, &dir.path().join("out1"), &["mkv"]),
            folder(&second, &dir.path().join("out2"), &["mkv"]),
        ];
        let report = batch.run(&folders, &night_window(), true).await;

        assert_eq!(transcoder.inputs(), vec!["a.mkv", "b.mkv"]);
        assert_eq!(report.stop, BatchStop::WindowClosed);
        assert_eq!(report.transcoded, 2);
    }

    #[tokio::test]
    async fn test_unscheduled_run_ignores_window() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("in");
        touch(&root.join("a.mkv"));
        touch(&root.join("b.mkv"));

        let clock = FakeClock::new(vec![at(1, 23, 0), at(2, 9, 0)]);
        let transcoder = FakeTranscoder::succeeding();
        let batch = walker(transcoder.clone(), clock, FailurePolicy::AbortFolder);
        let report = batch
            .run(&[folder(&root, &dir.path().join("out"), &["mkv"])], &night_window(), false)
            .await;

        assert_eq!(report.stop, BatchStop::Completed);
        assert_eq!(report.transcoded, 2);
    }

    #[tokio::test]
    async fn test_missing_folder_is_skipped() {
        let dir = TempDir::new().unwrap();
        let present = dir.path().join("present");
        touch(&present.join("a.mkv"));

        let transcoder = FakeTranscoder::succeeding();
        let batch = walker(transcoder.clone(), FakeClock::new(vec![at(1, 23, 0)]), FailurePolicy::AbortFolder);
        let folders = [
            folder(&dir.path().join("missing"), &dir.path().join("out1"), &["mkv"]),
            folder(&present, &dir.path().join("out2"), &["mkv"]),
        ];
        let report = batch.run(&folders, &ScheduleWindow::default(), false).await;

        assert_eq!(report.folders_skipped, 1);
        assert_eq!(transcoder.inputs(), vec!["a.mkv"]);
    }

    #[tokio::test]
    async fn test_reporter_sees_every_file() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("in");
        touch(&root.join("a.mkv"));
        touch(&root.join("b.mkv"));

        let reporter = Arc::new(RecordingReporter::default());
        let batch = BatchWalker::new(
            FakeTranscoder::new(failing_on("b.mkv")),
            FakeClock::new(vec![at(1, 23, 0)]),
            reporter.clone(),
            FailurePolicy::SkipFile,
        );
        batch
            .run(&[folder(&root, &dir.path().join("out"), &["mkv"])], &ScheduleWindow::default(), false)
            .await;

        let finished = reporter.finished.lock().unwrap();
        assert_eq!(finished.len(), 2);
        assert!(finished[0].1);
        assert!(!finished[1].1);
    }

    /// Transcoder whose job only ends when it is told to stop
    #[derive(Default)]
    struct StoppableTranscoder {
        started: Notify,
        stopped: Notify,
        calls: Mutex<Vec<PathBuf>>,
        stop_calls: Mutex<usize>,
    }

    #[async_trait]
    impl TranscodePort for StoppableTranscoder {
        async fn transcode(
            &self,
            request: TranscodeRequest,
            _on_progress: ProgressCallback,
        ) -> Result<TranscodeOutcome, SupervisorError> {
            self.calls.lock().unwrap().push(request.input_file.clone());
            self.started.notify_one();
            self.stopped.notified().await;
            Err(SupervisorError::Cancelled {
                input: request.input_file,
            })
        }

        async fn stop_transcoding(&self) {
            *self.stop_calls.lock().unwrap() += 1;
            self.stopped.notify_one();
        }

        fn status(&self) -> TranscodeStatus {
            TranscodeStatus::idle()
        }

        fn state(&self) -> JobState {
            JobState::Idle
        }
    }

    #[tokio::test]
    async fn test_stop_between_files_halts_batch() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        touch(&first.join("a.mkv"));
        touch(&first.join("b.mkv"));
        touch(&second.join("c.mkv"));

        let stop = StopHandle::new();
        let requested = stop.clone();
        let transcoder = FakeTranscoder::new(Box::new(move |_| {
            requested.request_stop();
            Ok(())
        }));
        let batch = walker(transcoder.clone(), FakeClock::new(vec![at(1, 23, 0)]), FailurePolicy::SkipFile)
            .with_stop_handle(stop);
        let folders = [
            folder(&first, &dir.path().join("out1"), &["mkv"]),
            folder(&second, &dir.path().join("out2"), &["mkv"]),
        ];
        let report = batch.run(&folders, &ScheduleWindow::default(), false).await;

        assert_eq!(transcoder.inputs(), vec!["a.mkv"]);
        assert_eq!(report.stop, BatchStop::Cancelled);
        assert_eq!(report.transcoded, 1);
    }

    #[tokio::test]
    async fn test_stop_before_run_starts_nothing() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("in");
        touch(&root.join("a.mkv"));

        let transcoder = FakeTranscoder::succeeding();
        let batch = walker(transcoder.clone(), FakeClock::new(vec![at(1, 23, 0)]), FailurePolicy::AbortFolder);
        batch.stop_handle().request_stop();
        let report = batch
            .run(&[folder(&root, &dir.path().join("out"), &["mkv"])], &ScheduleWindow::default(), false)
            .await;

        assert!(transcoder.inputs().is_empty());
        assert_eq!(report.stop, BatchStop::Cancelled);

        let err = batch
            .transcode_file(TranscodeRequest::new(root.join("a.mkv"), dir.path().join("out"), "Fast 1080p30"))
            .await
            .unwrap_err();
        assert!(matches!(err, SupervisorError::Cancelled { .. }));
        assert!(transcoder.inputs().is_empty());
    }

    #[tokio::test]
    async fn test_stop_during_transcode_stops_transcoder() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("in");
        touch(&root.join("a.mkv"));
        touch(&root.join("b.mkv"));

        let transcoder = Arc::new(StoppableTranscoder::default());
        let batch = BatchWalker::new(
            transcoder.clone(),
            FakeClock::new(vec![at(1, 23, 0)]),
            Arc::new(RecordingReporter::default()),
            FailurePolicy::SkipFile,
        );
        let stop = batch.stop_handle();
        let folders = [folder(&root, &dir.path().join("out"), &["mkv"])];

        let window = ScheduleWindow::default();
        let (report, ()) = tokio::join!(
            batch.run(&folders, &window, false),
            async {
                transcoder.started.notified().await;
                stop.request_stop();
            }
        );

        assert_eq!(report.stop, BatchStop::Cancelled);
        assert_eq!(*transcoder.calls.lock().unwrap(), vec![root.join("a.mkv")]);
        assert_eq!(*transcoder.stop_calls.lock().unwrap(), 1);
    }
}
