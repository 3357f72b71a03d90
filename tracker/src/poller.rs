//! Background escalation poller
//!
//! Runs one engine pass immediately and then every interval until told to
//! stop. A pass that overruns its interval delays the next tick instead of
//! bursting to catch up.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::workflow::SharedWorkflow;

/// Periodic engine runner
pub struct Poller {
    workflow: SharedWorkflow,
    interval: Duration,
}

/// Handle to a running poller
pub struct PollerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<u64>,
}

impl PollerHandle {
    /// Stop after the current pass; returns how many passes ran
    pub async fn stop(self) -> u64 {
        let _ = self.shutdown.send(true);
        match self.task.await {
            Ok(passes) => passes,
            Err(e) => {
                warn!(error = %e, "Poller task ended abnormally");
                0
            }
        }
    }
}

impl Poller {
    pub fn new(workflow: SharedWorkflow, interval: Duration) -> Self {
        Self { workflow, interval }
    }

    /// Spawn onto the current runtime
    pub fn spawn(self) -> PollerHandle {
        let (shutdown, rx) = watch::channel(false);
        let task = tokio::spawn(self.run(rx));
        PollerHandle { shutdown, task }
    }

    /// Poll until `shutdown` becomes true or its sender is dropped
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> u64 {
        info!(interval_secs = self.interval.as_secs(), "Escalation poller started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut passes = 0u64;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let report = self.workflow.run_escalation().await;
                    passes += 1;
                    if report.failed > 0 {
                        warn!(failed = report.failed, "Some transitions were not applied");
                    }
                    debug!(pass = passes, "{}", report.summary());
                }
            }
        }

        info!(passes, "Escalation poller stopped");
        passes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::ledger::MemoryLedgerStore;
    use crate::notify::NullNotifier;
    use crate::photo::MemoryPhotoStore;
    use crate::store::MemoryTicketStore;
    use crate::workflow::Workflow;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_runs_immediately_then_every_interval() {
        let workflow = Workflow::new(
            Arc::new(SystemClock),
            Arc::new(MemoryTicketStore::new()),
            Arc::new(MemoryLedgerStore::new()),
            Arc::new(MemoryPhotoStore::new()),
            Arc::new(NullNotifier),
        )
        .shared();

        let handle = Poller::new(workflow, Duration::from_secs(5)).spawn();
        tokio::time::sleep(Duration::from_millis(12_500)).await;
        assert_eq!(handle.stop().await, 3);
    }
}
