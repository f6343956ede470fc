// Tracing log adapter - Transcode lifecycle events as structured logs

use tracing::{error, info, warn};

use crate::domain::model::*;
use crate::ports::*;

/// Observer writing every lifecycle event to the tracing subscriber
pub struct TracingObserver;

impl TracingObserver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscodeObserver for TracingObserver {
    fn on_event(&self, event: &TranscodeEvent) {
        let input = event.input_file();
        match event {
            TranscodeEvent::Started { .. } => info!(input, "Transcoding started"),
            TranscodeEvent::Completed { .. } => info!(input, "Transcoding completed"),
            TranscodeEvent::Error { reason, .. } => match reason {
                ErrorReason::TranscodeFailed { exit_code } => {
                    error!(input, exit_code = ?exit_code, "Transcoding failed");
                }
                ErrorReason::StartFailed { message } => {
                    error!(input, error = %message, "Transcoder could not be started");
                }
                ErrorReason::SourceDelete { message } => {
                    warn!(input, error = %message, "Could not remove original after transcoding");
                }
            },
            TranscodeEvent::Cancelled { .. } => warn!(input, "Transcoding cancelled"),
        }
    }
}
