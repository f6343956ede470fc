use std::sync::Arc;

use crate::adapters::{
    IndicatifProgressReporter, SysinfoProcessReaper, SystemClock, TracingObserver,
};
use crate::app::batch_walker::BatchWalker;
use crate::domain::model::Settings;
use crate::engine::ProcessSupervisor;
use crate::ports::{ClockPort, ProcessReaperPort, ProgressReporter, TranscodePort};

pub trait AppContainer: Send + Sync {
    fn transcoder(&self) -> Arc<dyn TranscodePort>;
    fn reaper(&self) -> Arc<dyn ProcessReaperPort>;
    fn batch_walker(&self) -> Arc<BatchWalker>;
}

pub struct DefaultAppContainer {
    transcoder: Arc<dyn TranscodePort>,
    reaper: Arc<dyn ProcessReaperPort>,
    batch_walker: Arc<BatchWalker>,
}

impl DefaultAppContainer {
    /// Wire the supervisor and adapters for `settings`
    pub fn new(settings: &Settings, show_progress: bool) -> Self {
        let supervisor = ProcessSupervisor::new(settings.handbrake.cli_path.clone())
            .with_observer(Arc::new(TracingObserver::new()));
        let transcoder: Arc<dyn TranscodePort> = Arc::new(supervisor);

        let reporter: Arc<dyn ProgressReporter> = if show_progress {
            Arc::new(IndicatifProgressReporter::new())
        } else {
            Arc::new(IndicatifProgressReporter::hidden())
        };
        let clock: Arc<dyn ClockPort> = Arc::new(SystemClock);

        let batch_walker = Arc::new(BatchWalker::new(
            Arc::clone(&transcoder),
            clock,
            reporter,
            settings.batch.failure_policy,
        ));

        Self {
            transcoder,
            reaper: Arc::new(SysinfoProcessReaper::new()),
            batch_walker,
        }
    }
}

impl AppContainer for DefaultAppContainer {
    fn transcoder(&self) -> Arc<dyn TranscodePort> {
        Arc::clone(&self.transcoder)
    }

    fn reaper(&self) -> Arc<dyn ProcessReaperPort> {
        Arc::clone(&self.reaper)
    }

    fn batch_walker(&self) -> Arc<BatchWalker> {
        Arc::clone(&self.batch_walker)
    }
}
