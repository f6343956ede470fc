//! hbsched: scheduled batch transcoding driven by HandBrakeCLI
//!
//! Walks configured folders and transcodes every matching file through a
//! single supervised HandBrakeCLI process, tracking progress from its
//! status output.
//!
//! # Usage
//!
//! ```bash
//! hbsched run --scheduled
//! hbsched transcode --input movie.mkv --output-dir /media/out
//! hbsched check --json
//! ```

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use domain::errors::{ConfigError, ErrorCategory, FolderProcessingError, SupervisorError};
pub use domain::model::{JobState, Settings, TranscodeEvent, TranscodeRequest, TranscodeStatus};
pub use engine::ProcessSupervisor;
pub use error::{HbschedError, HbschedResult};
