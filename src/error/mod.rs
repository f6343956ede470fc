//! Top-level error type for hbsched

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::errors::ConfigError;

/// Errors that end a command
#[derive(Error, Debug)]
pub enum HbschedError {
    /// The settings file is missing and nothing else names a transcoder
    #[error("settings file '{}' not found and no transcoder path given", .path.display())]
    SettingsNotFound { path: PathBuf },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type alias for hbsched operations
pub type HbschedResult<T> = Result<T, HbschedError>;
