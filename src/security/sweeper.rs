//! Background eviction of expired rate-limit counters.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;

use crate::security::rate_limit::unix_millis;
use crate::security::store::CounterStore;

/// Periodically drops counters whose window has elapsed. Exits on shutdown.
pub struct CounterSweeper {
    store: Arc<dyn CounterStore>,
    interval: Duration,
}

impl CounterSweeper {
    pub fn new(store: Arc<dyn CounterStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if self.interval.is_zero() {
            tracing::info!("Counter sweeper disabled");
            return;
        }

        tracing::info!(interval_secs = self.interval.as_secs(), "Counter sweeper starting");
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.store.sweep(unix_millis());
                    if evicted > 0 {
                        tracing::debug!(evicted, remaining = self.store.len(), "Swept expired counters");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Counter sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::store::{InMemoryCounterStore, RateLimitKey};

    #[tokio::test]
    async fn test_sweeps_and_stops_on_shutdown() {
        let store: Arc<dyn CounterStore> = Arc::new(InMemoryCounterStore::new());
        store.increment(&RateLimitKey::new("global", "1.1.1.1"), 0, 1, 10);
        assert_eq!(store.len(), 1);

        let (tx, rx) = broadcast::channel(1);
        let handle = CounterSweeper::new(store.clone(), Duration::from_millis(10)).spawn(rx);

        for _ in 0..50 {
            if store.is_empty() {
                break;
            }
            time::sleep(Duration::from_millis(10)).await;
        }
        assert!(store.is_empty());

        tx.send(()).unwrap();
        time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }
}
