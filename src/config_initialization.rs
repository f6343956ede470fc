//! Configuration initialization and hierarchy management

use tracing::{debug, info};

use crate::adapters::toml_config::TomlConfigAdapter;
use crate::cli::Cli;
use crate::domain::model::Settings;
use crate::error::{HbschedError, HbschedResult};
use crate::ports::ConfigPort;

/// Build settings following precedence: CLI > Env > File > Defaults.
///
/// clap already folds `HBSCHED_*` environment values into `cli`, so applying
/// the CLI overrides last covers both upper layers.
pub async fn initialize_settings(cli: &Cli, config: &dyn ConfigPort) -> HbschedResult<Settings> {
    let explicit = cli.config.is_some();
    let path = cli
        .config
        .clone()
        .unwrap_or_else(TomlConfigAdapter::default_config_path);

    let mut settings = if explicit || path.is_file() {
        info!(path = %path.display(), "Loading settings");
        config.load_settings(&path).await?
    } else {
        match &cli.cli_path {
            Some(cli_path) => {
                debug!(path = %path.display(), "No settings file, using defaults");
                Settings::for_cli_path(cli_path.clone())
            }
            None => return Err(HbschedError::SettingsNotFound { path }),
        }
    };

    apply_overrides(&mut settings, cli);
    config.validate(&settings)?;
    Ok(settings)
}

/// Apply CLI (and environment) overrides onto file settings
pub fn apply_overrides(settings: &mut Settings, cli: &Cli) {
    if let Some(cli_path) = &cli.cli_path {
        debug!(cli_path = %cli_path.display(), "Override: handbrake.cli_path");
        settings.handbrake.cli_path = cli_path.clone();
    }
    if let Some(level) = &cli.log_level {
        debug!(level = %level, "Override: logging.level");
        settings.logging.level = level.clone();
    }
}
