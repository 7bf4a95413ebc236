//! Periodic alert scans on the tokio runtime

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::library::Library;
use crate::observability::{log_event, Event};

use super::{deliver_due_alerts, AlertPolicy, AlertSink};

/// tokio rejects a zero period
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Starts the background scan task
pub struct AlertScheduler;

impl AlertScheduler {
    /// Spawn the scan loop on the current tokio runtime.
    ///
    /// The first scan runs immediately, then once per `policy.interval`.
    /// Dropping the handle also stops the loop.
    pub fn spawn(
        library: Arc<Library>,
        sink: Arc<dyn AlertSink>,
        policy: AlertPolicy,
    ) -> AlertSchedulerHandle {
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let period = policy.interval.max(MIN_INTERVAL);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;

                    _ = cancel_rx.changed() => break,

                    _ = ticker.tick() => {
                        // Takes the registry mutex; must not block a runtime worker.
                        let library = Arc::clone(&library);
                        let sink = Arc::clone(&sink);
                        let today = Local::now().date_naive();
                        let scan = tokio::task::spawn_blocking(move || {
                            deliver_due_alerts(&library, sink.as_ref(), today, policy.days_before)
                        });
                        if let Err(e) = scan.await {
                            log_event(Event::AlertScanFailed, &[("error", &e.to_string())]);
                        }
                    }
                }
            }

            log_event(Event::SchedulerStopped, &[]);
        });

        log_event(
            Event::SchedulerStarted,
            &[
                ("interval_ms", &period.as_millis().to_string()),
                ("days_before", &policy.days_before.to_string()),
            ],
        );

        AlertSchedulerHandle { cancel_tx, task }
    }
}

/// Control handle for a running scheduler
pub struct AlertSchedulerHandle {
    cancel_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl AlertSchedulerHandle {
    /// Cancel future scans and wait for the loop to exit. A scan already in
    /// progress completes first.
    pub async fn stop(self) {
        let _ = self.cancel_tx.send(true);
        let _ = self.task.await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
