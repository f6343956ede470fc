// Adapters - External system implementations

pub mod console_progress;
pub mod process_reaper;
pub mod system_clock;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use console_progress::IndicatifProgressReporter;
pub use process_reaper::SysinfoProcessReaper;
pub use system_clock::SystemClock;
pub use toml_config::TomlConfigAdapter;
pub use tracing_log::TracingObserver;
