// Console progress adapter - per-file progress bars with indicatif

use std::path::Path;
use std::sync::{Arc, Mutex};

use indicatif::{ProgressBar, ProgressStyle};

use crate::domain::model::*;
use crate::ports::*;
use crate::utils::path::file_name_string;

const BAR_TEMPLATE: &str = "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}% {msg}";

/// One progress bar per file, cleared when the file finishes
pub struct IndicatifProgressReporter {
    visible: bool,
    current: Mutex<Option<ProgressBar>>,
}

impl IndicatifProgressReporter {
    /// Reporter drawing to the terminal
    pub fn new() -> Self {
        Self {
            visible: true,
            current: Mutex::new(None),
        }
    }

    /// Reporter that tracks progress without drawing anything
    pub fn hidden() -> Self {
        Self {
            visible: false,
            current: Mutex::new(None),
        }
    }

    fn make_bar(&self) -> ProgressBar {
        if !self.visible {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(100);
        if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
            bar.set_style(style.progress_chars("=> "));
        }
        bar
    }
}

impl Default for IndicatifProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Bar message for one status snapshot
pub fn progress_message(file_name: &str, status: &TranscodeStatus) -> String {
    format!("{} - AverageFps: {:.2}", file_name, status.average_fps)
}

impl ProgressReporter for IndicatifProgressReporter {
    fn file_started(&self, input: &Path) -> ProgressCallback {
        let bar = self.make_bar();
        let file_name = file_name_string(input);
        bar.set_message(file_name.clone());

        if let Ok(mut current) = self.current.lock() {
            if let Some(previous) = current.replace(bar.clone()) {
                previous.finish_and_clear();
            }
        }

        Arc::new(move |status: &TranscodeStatus| {
            bar.set_position(status.percentage.clamp(0.0, 100.0) as u64);
            bar.set_message(progress_message(&file_name, status));
        })
    }

    fn file_finished(&self, _input: &Path, success: bool) {
        let Ok(mut current) = self.current.lock() else {
            return;
        };
        if let Some(bar) = current.take() {
            if success {
                bar.set_position(100);
            }
            bar.finish_and_clear();
        }
    }
}
