// Application layer - Use case orchestration

pub mod batch_walker;
pub mod container;

// Re-export
pub use batch_walker::{BatchReport, BatchStop, BatchWalker};
pub use container::{AppContainer, DefaultAppContainer};
