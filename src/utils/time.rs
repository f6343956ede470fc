//! Time-of-day parsing and duration formatting utilities

use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Deserializer};

use crate::domain::errors::ConfigError;

/// Parse a time of day written as `HH:MM` or `HH:MM:SS`
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, ConfigError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| ConfigError::InvalidTimeOfDay(value.to_string()))
}

/// Serde helper for optional time-of-day settings
pub fn time_of_day_opt<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        Some(raw) if !raw.trim().is_empty() => parse_time_of_day(&raw)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

/// Format a duration the way the transcoder reports ETAs: `HHhMMmSSs`
pub fn format_eta(duration: Duration) -> String {
    let total = duration.as_secs();
    format!(
        "{:02}h{:02}m{:02}s",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
