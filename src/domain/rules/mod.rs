// Domain rules - Business logic and policies

use chrono::{Days, NaiveDateTime, NaiveTime};

use crate::domain::errors::*;
use crate::domain::model::*;


/// Outcome of a time window check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowDecision {
    Continue,
    Stop,
}

/// Daily cutoff for scheduled batch runs
pub struct TimeWindowPolicy;

impl TimeWindowPolicy {
    /// Instant after which a run started at `run_start` must stop.
    ///
    /// An end before the start means the window spans midnight, so the cutoff
    /// falls on the day after the run started.
    pub fn effective_cutoff(
        start: NaiveTime,
        end: NaiveTime,
        run_start: NaiveDateTime,
    ) -> NaiveDateTime {
        let date = run_start.date();
        let date = if end < start {
            date.checked_add_days(Days::new(1)).unwrap_or(date)
        } else {
            date
        };
        date.and_time(end)
    }

    /// Pure decision for a fully specified window
    pub fn decide(
        start: NaiveTime,
        end: NaiveTime,
        run_start: NaiveDateTime,
        now: NaiveDateTime,
    ) -> WindowDecision {
        if now > Self::effective_cutoff(start, end, run_start) {
            WindowDecision::Stop
        } else {
            WindowDecision::Continue
        }
    }

    /// Decision for a configured window.
    ///
    /// Only scheduled invocations with both bounds present are ever cut off.
    pub fn check(
        window: &ScheduleWindow,
        scheduled: bool,
        run_start: NaiveDateTime,
        now: NaiveDateTime,
    ) -> WindowDecision {
        if !scheduled {
            return WindowDecision::Continue;
        }
        match window.bounds() {
            Some((start, end)) => Self::decide(start, end, run_start, now),
            None => WindowDecision::Continue,
        }
    }
}

/// What the batch does after a file's transcode returned an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFlow {
    /// Carry on with the next file of the folder
    NextFile,
    /// Abandon the remaining files of this folder
    AbortFolder,
    /// Stop the whole batch
    HaltBatch,
}

/// How far a per-file failure propagates
pub struct FailureBoundary;

impl FailureBoundary {
    pub fn after_error(policy: FailurePolicy, error: &SupervisorError) -> FileFlow {
        match error.category() {
            ErrorCategory::Cancelled => FileFlow::HaltBatch,
            ErrorCategory::Cleanup => FileFlow::NextFile,
            ErrorCategory::Preflight | ErrorCategory::Start | ErrorCategory::Failed => {
                match policy {
                    FailurePolicy::AbortFolder => FileFlow::AbortFolder,
                    FailurePolicy::SkipFile => FileFlow::NextFile,
                }
            }
        }
    }
}
