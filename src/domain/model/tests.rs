// Unit tests for domain models

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use chrono::NaiveTime;

    use crate::domain::model::*;

    fn full_line(percentage: f32) -> ProgressLine {
        ProgressLine {
            percentage,
            detail: Some(ProgressDetail {
                current_fps: 85.2,
                average_fps: 80.1,
                eta: Duration::from_secs(135),
            }),
        }
    }

    #[test]
    fn test_status_idle() {
        let status = TranscodeStatus::idle();
        assert!(!status.converting);
        assert!(status.input_file.is_empty());
        assert!(status.output_file.is_empty());
        assert_eq!(status.percentage, 0.0);
        assert_eq!(status.estimated, Duration::ZERO);
        assert_eq!(status.to_string(), "Idle");
    }

    #[test]
    fn test_status_for_job_strips_paths() {
        let status = TranscodeStatus::for_job(Path::new("/in/sub/movie.mkv"), Path::new("/out/sub/movie.mp4"));
        assert!(status.converting);
        assert_eq!(status.input_file, "movie.mkv");
        assert_eq!(status.output_file, "movie.mp4");
        assert_eq!(status.percentage, 0.0);
        assert_eq!(status.current_fps, 0.0);
        assert_eq!(status.average_fps, 0.0);
    }

    #[test]
    fn test_percentage_only_line_keeps_known_detail() {
        let mut status = TranscodeStatus::for_job(Path::new("a.mkv"), Path::new("a.mp4"));
        status.apply(&full_line(42.37));

        status.apply(&ProgressLine {
            percentage: 50.0,
            detail: None,
        });

        assert_eq!(status.percentage, 50.0);
        assert_eq!(status.current_fps, 85.2);
        assert_eq!(status.average_fps, 80.1);
        assert_eq!(status.estimated, Duration::from_secs(135));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut status = TranscodeStatus::for_job(Path::new("a.mkv"), Path::new("a.mp4"));
        let line = full_line(12.5);
        status.apply(&line);
        let first = status.clone();
        status.apply(&line);
        assert_eq!(status, first);
    }

    #[test]
    fn test_status_display_while_converting() {
        let mut status = TranscodeStatus::for_job(Path::new("a.mkv"), Path::new("a.mp4"));
        status.apply(&full_line(42.37));
        assert_eq!(
            status.to_string(),
            "a.mkv -> a.mp4 - 42.37%  85.20 fps.  80.10 fps. avg.  00h02m15s time remaining"
        );
    }

    #[test]
    fn test_job_state_activity() {
        assert!(JobState::Starting.is_active());
        assert!(JobState::Running.is_active());
        assert!(!JobState::Idle.is_active());
        assert!(!JobState::Cancelled.is_active());
    }

    #[test]
    fn test_request_defaults() {
        let request = TranscodeRequest::new("/in/a.mkv", "/out", "Fast 1080p30");
        assert!(request.overwrite_existing);
        assert!(request.delete_source);
        assert!(request.output_filename.is_none());

        let request = request.overwrite_existing(false).delete_source(false).with_output_filename("b");
        assert!(!request.overwrite_existing);
        assert!(!request.delete_source);
        assert_eq!(request.output_filename.as_deref(), Some("b"));
    }

    #[test]
    fn test_settings_deserialize_with_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [handbrake]
            cli_path = "/usr/bin/HandBrakeCLI"

            [[handbrake.folders]]
            input_path = "/media/in"
            output_path = "/media/out"
            file_extensions = [".mkv", "avi"]

            [schedule]
            enabled = true
            start_time = "22:00"
            end_time = "06:00:30"
            "#,
        )
        .unwrap();

        let folder = &settings.handbrake.folders[0];
        assert_eq!(folder.preset, "HQ 1080p30 Surround");
        assert!(folder.preserve_folder_structure);
        assert!(folder.delete_source);
        assert!(folder.overwrite_existing);
        assert_eq!(settings.handbrake.effective_process_name(), "HandBrakeCLI");
        assert_eq!(
            settings.schedule.bounds(),
            Some((
                NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(6, 0, 30).unwrap()
            ))
        );
        assert_eq!(settings.batch.failure_policy, FailurePolicy::AbortFolder);
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.logging.format, LogFormat::Pretty);
        assert!(settings.logging.file.is_none());
    }

    #[test]
    fn test_settings_read_log_file() {
        let settings: Settings = toml::from_str(
            r#"
            [handbrake]
            cli_path = "/usr/bin/HandBrakeCLI"

            [logging]
            format = "json"
            file = "/var/log/hbsched.log"
            "#,
        )
        .unwrap();

        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(
            settings.logging.file.as_deref(),
            Some(std::path::Path::new("/var/log/hbsched.log"))
        );
    }

    #[test]
    fn test_settings_reject_bad_time() {
        let parsed: Result<Settings, _> = toml::from_str(
            r#"
            [handbrake]
            cli_path = "/usr/bin/HandBrakeCLI"

            [schedule]
            start_time = "late"
            "#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_event_input_file() {
        let event = TranscodeEvent::Error {
            input_file: "a.mkv".to_string(),
            reason: ErrorReason::TranscodeFailed { exit_code: Some(1) },
        };
        assert_eq!(event.input_file(), "a.mkv");
    }
}
