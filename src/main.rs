//! hbsched command-line entry point

use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use hbsched_cli::adapters::TomlConfigAdapter;
use hbsched_cli::app::{AppContainer, DefaultAppContainer};
use hbsched_cli::cli::{commands, Cli, Commands};
use hbsched_cli::config_initialization::initialize_settings;
use hbsched_cli::utils::logging::init_logging;
use hbsched_cli::utils::shutdown::ShutdownSignals;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = initialize_settings(&cli, &TomlConfigAdapter::new())
        .await
        .context("Failed to load settings")?;
    let _log_guard = init_logging(&settings.logging, cli.log_level.is_some())
        .context("Failed to open log file")?;

    let container: Arc<dyn AppContainer> = Arc::new(DefaultAppContainer::new(
        &settings,
        std::io::stderr().is_terminal(),
    ));

    if let Commands::Check(args) = &cli.command {
        return commands::check(container.as_ref(), &settings, args.clone());
    }

    let mut signals = ShutdownSignals::install().context("Failed to install signal handlers")?;
    info!("Starting hbsched");
    let process_name = settings.handbrake.effective_process_name();
    container.reaper().reap(&process_name);

    let stop = container.batch_walker().stop_handle();
    let transcoder = container.transcoder();
    let mut work = tokio::spawn(commands::execute(
        Arc::clone(&container),
        settings,
        cli.command,
    ));

    let finished = tokio::select! {
        joined = &mut work => Ok(joined),
        signal = signals.recv() => Err(signal),
    };
    let joined = match finished {
        Ok(joined) => joined,
        Err(signal) => {
            warn!(signal, "Shutdown requested, stopping batch");
            stop.request_stop();
            transcoder.stop_transcoding().await;
            work.await
        }
    };

    transcoder.stop_transcoding().await;
    if transcoder.state().is_active() {
        warn!("Transcoder still active at shutdown");
    }
    container.reaper().reap(&process_name);

    joined.context("Command task failed")??;
    info!("hbsched finished");
    Ok(())
}
