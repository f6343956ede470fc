// TOML config adapter - Settings loaded from a TOML file

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// File name looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "hbsched.toml";

/// TOML configuration adapter
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Create new TOML config adapter
    pub fn new() -> Self {
        Self
    }

    /// Default settings path in the current directory
    pub fn default_config_path() -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    /// Parse settings from TOML text
    pub fn parse(path: &Path, content: &str) -> Result<Settings, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Default for TomlConfigAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigPort for TomlConfigAdapter {
    async fn load_settings(&self, file_path: &Path) -> Result<Settings, ConfigError> {
        debug!(path = %file_path.display(), "Loading settings");
        let content = tokio::fs::read_to_string(file_path)
            .await
            .map_err(|source| ConfigError::Read {
                path: file_path.to_path_buf(),
                source,
            })?;
        Self::parse(file_path, &content)
    }

    fn validate(&self, settings: &Settings) -> Result<(), ConfigError> {
        if settings.handbrake.cli_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "handbrake.cli_path must not be empty".to_string(),
            ));
        }

        for (index, folder) in settings.handbrake.folders.iter().enumerate() {
            if folder.input_path.as_os_str().is_empty() || folder.output_path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "folder #{} needs both input_path and output_path",
                    index + 1
                )));
            }
            if folder.file_extensions.iter().all(|ext| ext.trim_start_matches('.').trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "folder '{}' lists no file extensions",
                    folder.input_path.display()
                )));
            }
        }

        let schedule = &settings.schedule;
        if schedule.enabled && schedule.start_time.is_none() {
            return Err(ConfigError::Invalid(
                "schedule.enabled requires schedule.start_time".to_string(),
            ));
        }
        if schedule.enabled && schedule.end_time.is_none() {
            warn!("schedule.end_time is not set, scheduled runs will not be cut off");
        }

        Ok(())
    }
}
