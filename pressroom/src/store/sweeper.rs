//! Periodic retention sweep.
//!
//! A single background task that wakes on a fixed interval and asks the store
//! to evict artifacts past their retention horizon. Eviction is best-effort
//! and idempotent: a failed pass logs and waits for the next tick, and an
//! artifact deleted out from under the sweep is simply skipped.

use crate::store::ArtifactStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct EvictionSweeper {
    store: Arc<ArtifactStore>,
    retention: Duration,
    grace: Duration,
    interval: Duration,
}

impl EvictionSweeper {
    pub fn new(store: Arc<ArtifactStore>, retention: Duration, grace: Duration, interval: Duration) -> Self {
        Self {
            store,
            retention,
            grace,
            interval,
        }
    }

    /// Run sweep passes until `shutdown` is cancelled.
    ///
    /// The first pass runs after one full interval, not immediately; startup
    /// already rescans the store and a fresh process has nothing to evict
    /// that could not wait.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            "Eviction sweeper started (retention {}, grace {}, every {})",
            humantime::format_duration(self.retention),
            humantime::format_duration(self.grace),
            humantime::format_duration(self.interval),
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ticker.tick().await; // first tick fires immediately, skip it

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.store.evict_expired(self.retention, self.grace).await;
                    if evicted > 0 {
                        info!("Sweep evicted {} artifact(s), {} remaining", evicted, self.store.len());
                    } else {
                        debug!("Sweep found nothing to evict");
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("Eviction sweeper shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[tokio::test]
    async fn sweeper_evicts_expired_artifacts_and_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ArtifactStore::open(dir.path()).await.unwrap());

        let artifact = store
            .store(Uuid::new_v4(), "invoice", "x.pdf".to_string(), b"%PDF-1.4 body")
            .await
            .unwrap();
        store.backdate(&artifact.id, Utc::now() - chrono::Duration::hours(1));

        let sweeper = EvictionSweeper::new(
            store.clone(),
            Duration::from_millis(1),
            Duration::from_millis(1),
            Duration::from_millis(10),
        );
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(sweeper.run(shutdown.clone()));

        tokio::time::timeout(Duration::from_secs(5), async {
            while !store.is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("sweeper should evict the backdated artifact");

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper should exit on cancellation")
            .unwrap();
    }
}
