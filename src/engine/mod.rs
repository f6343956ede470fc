//! Transcoder engine: progress parsing and process supervision

pub mod progress;
pub mod supervisor;

pub use progress::ProgressParser;
pub use supervisor::ProcessSupervisor;
