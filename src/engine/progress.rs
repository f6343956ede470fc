//! Parser for the transcoder's textual progress stream

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::domain::model::{ProgressDetail, ProgressLine};

/// Example: `Encoding: task 1 of 1, 42.37 % (85.20 fps, avg 80.10 fps, ETA 00h02m15s)`
const PROGRESS_PATTERN: &str = r"Encoding:.*?, (\d{1,3}\.\d{1,2}) %(?: \((\d{1,4}\.\d{1,2}) fps, avg (\d{1,4}\.\d{1,2}) fps, ETA (\d{2})h(\d{2})m(\d{2})s\))?";

fn progress_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(PROGRESS_PATTERN).expect("progress pattern is valid"))
}

/// Stateless line parser
pub struct ProgressParser;

impl ProgressParser {
    /// Parse one output line; anything that is not a progress line yields `None`
    pub fn parse(line: &str) -> Option<ProgressLine> {
        let captures = progress_regex().captures(line)?;
        let percentage = captures.get(1)?.as_str().parse::<f32>().ok()?.clamp(0.0, 100.0);

        let detail = match (captures.get(2), captures.get(3)) {
            (Some(current), Some(average)) => Some(ProgressDetail {
                current_fps: current.as_str().parse().ok()?,
                average_fps: average.as_str().parse().ok()?,
                eta: Self::eta(&captures)?,
            }),
            _ => None,
        };

        Some(ProgressLine { percentage, detail })
    }

    fn eta(captures: &regex::Captures<'_>) -> Option<Duration> {
        let field = |index: usize| -> Option<u64> { captures.get(index)?.as_str().parse().ok() };
        let (hours, minutes, seconds) = (field(4)?, field(5)?, field(6)?);
        Some(Duration::from_secs(hours * 3600 + minutes * 60 + seconds))
    }
}

/// Split a raw output chunk into logical lines.
///
/// The transcoder redraws its status with carriage returns, so both `\r`
/// and `\n` terminate a line. Blank pieces are dropped.
pub fn split_lines(chunk: &str) -> impl Iterator<Item = &str> {
    chunk
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
}
