//! Periodic refresh driving the environment set.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::inventory::EnvironmentSet;

/// Interval applied when the caller does not configure one.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);

/// Handle to a running refresh loop.
///
/// Dropping the handle also stops the loop; [`SchedulerHandle::cancel`]
/// additionally waits for it to wind down.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal the loop to stop and wait for it to finish. A refresh that is
    /// already in flight completes first; no new one starts.
    pub async fn cancel(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            warn!("refresh loop panicked: {err}");
        }
    }
}

/// Spawn the refresh loop: one refresh immediately, then one per interval.
///
/// The pause between passes is `interval` minus however long the last pass
/// took, so slow environments do not stretch the period. Passes never
/// overlap.
pub fn start(set: Arc<EnvironmentSet>, interval: Duration, long: bool) -> SchedulerHandle {
    let (shutdown, mut observed) = watch::channel(false);
    let task = tokio::spawn(async move {
        loop {
            let started = Instant::now();
            set.refresh_all(long).await;
            let elapsed = started.elapsed();
            debug!("refresh pass over {} environment(s) took {elapsed:?}", set.len());

            let pause = interval.saturating_sub(elapsed);
            tokio::select! {
                cancelled = observed.changed() => {
                    if cancelled.is_err() || *observed.borrow() {
                        break;
                    }
                }
                () = tokio::time::sleep(pause) => {}
            }
        }
        debug!("refresh loop stopped");
    });
    SchedulerHandle { shutdown, task }
}
