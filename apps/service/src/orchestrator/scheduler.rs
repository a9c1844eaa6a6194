use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use super::PollOrchestrator;

/// Triggers a polling cycle on a fixed interval
pub struct PollScheduler {
    orchestrator: Arc<PollOrchestrator>,
    interval: Duration,
}

impl PollScheduler {
    pub fn new(orchestrator: Arc<PollOrchestrator>, interval: Duration) -> Self {
        Self { orchestrator, interval }
    }

    /// Poll until the task is aborted. The first cycle runs immediately.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Polling {} networks every {}s", self.orchestrator.registry().len(), self.interval.as_secs());

        loop {
            interval.tick().await;

            let report = self.orchestrator.run_polling_cycle().await;
            if let Some(error) = &report.error {
                warn!("Polling cycle reported failures: {}", error);
            }
        }
    }

    /// Start the scheduler as a background task
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
