//! Common utilities and helpers

pub mod logging;
pub mod path;
pub mod shutdown;
pub mod time;
