use crate::store::Store;

use std::time::Duration;

use chrono::TimeDelta;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Periodically evicts entries that have not been re-registered within an
/// expiration window.
#[derive(Debug)]
pub struct Janitor {
    shutdown_token: CancellationToken,
    task_tracker: TaskTracker,
}

impl Janitor {
    /// Spawns the eviction loop. It runs every half expiration, and at least
    /// a second apart.
    #[must_use]
    pub fn start(store: Store, expiration: Duration) -> Self {
        let shutdown_token = CancellationToken::new();
        let task_tracker = TaskTracker::new();

        let period = (expiration / 2).max(MIN_PERIOD);
        let max_age = TimeDelta::from_std(expiration).unwrap_or(TimeDelta::MAX);

        let token = shutdown_token.clone();
        task_tracker.spawn(async move {
            let mut ticker = tokio::time::interval(period);

            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let cutoff = store.now() - max_age;
                let evicted = store.evict_older_than(cutoff);
                if evicted > 0 {
                    info!(evicted, remaining = store.len(), "evicted expired indicator documents");
                } else {
                    debug!("no expired indicator documents");
                }
            }
        });
        task_tracker.close();

        Self {
            shutdown_token,
            task_tracker,
        }
    }

    /// Stops the loop and waits for it to exit.
    pub async fn shutdown(&self) {
        info!("janitor shutting down...");

        self.shutdown_token.cancel();
        self.task_tracker.wait().await;

        info!("janitor shutdown");
    }
}
