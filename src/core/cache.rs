//! Orchestrates the stored snapshot and the remote fetcher.

use crate::core::error::{RateError, Result};
use crate::core::rates::{RateFetcher, RateSnapshot};
use crate::store::RateStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

/// What to do when the stored snapshot is stale and the fetch fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalePolicy {
    /// Return the fetch error to the caller.
    #[default]
    Propagate,
    /// Fall back to the last stored snapshot, however old. Errors only when none exists.
    ServeStale,
}

/// Shortest cadence `spawn_refresh` will run at.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(1);

pub struct RateCache {
    store: RateStore,
    fetcher: Arc<dyn RateFetcher>,
    policy: StalePolicy,
}

impl RateCache {
    pub fn new(store: RateStore, fetcher: Arc<dyn RateFetcher>) -> Self {
        Self {
            store,
            fetcher,
            policy: StalePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: StalePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the stored snapshot while fresh, otherwise fetches, stores and returns a new one.
    #[instrument(name = "CurrentRates", skip(self))]
    pub async fn current_rates(&self) -> Result<RateSnapshot> {
        if let Some(snapshot) = self.store.load().await? {
            debug!("Cache HIT for rate snapshot");
            return Ok(snapshot);
        }
        debug!("Cache MISS for rate snapshot");

        let rates = match self.fetcher.fetch_rates().await {
            Ok(rates) => rates,
            Err(e) => return self.on_fetch_error(e).await,
        };
        let fetched_at = self.store.save(&rates).await?;
        info!(currencies = rates.len(), "Refreshed exchange rates");

        Ok(RateSnapshot::new(rates, fetched_at))
    }

    async fn on_fetch_error(&self, error: RateError) -> Result<RateSnapshot> {
        if self.policy == StalePolicy::ServeStale {
            if let Some(snapshot) = self.store.load_latest().await? {
                warn!("Rate fetch failed, serving stale snapshot: {}", error);
                return Ok(snapshot);
            }
        }
        Err(error)
    }

    /// Revalidates the cache now and then every `interval`, handing each outcome to `on_update`.
    ///
    /// The task runs until the returned handle is cancelled or dropped. A zero `interval`
    /// is raised to [`MIN_REFRESH_INTERVAL`]; ticks missed while the process was suspended
    /// are not replayed.
    pub fn spawn_refresh<F>(self: Arc<Self>, interval: Duration, on_update: F) -> RefreshHandle
    where
        F: Fn(Result<RateSnapshot>) + Send + 'static,
    {
        let interval = interval.max(MIN_REFRESH_INTERVAL);
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = &mut cancel_rx => {
                        debug!("Rate refresh cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        debug!("Rate refresh tick");
                        let update = self.current_rates().await;
                        on_update(update);
                    }
                }
            }
        });

        RefreshHandle {
            cancel: Some(cancel_tx),
            task,
        }
    }
}

/// Handle to a running refresh task. Dropping it stops the task.
pub struct RefreshHandle {
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Stops the refresh task and waits for it to finish.
    pub async fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        if let Err(e) = (&mut self.task).await {
            warn!("Rate refresh task ended abnormally: {}", e);
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        if self.cancel.is_some() {
            self.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rates::{FRESHNESS_WINDOW, RateTable, now_millis};
    use crate::store::rates::RATES_KEY;
    use crate::store::{KeyValueStore, MemoryStore};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockFetcher {
        call_count: AtomicUsize,
        response: Mutex<Result<RateTable>>,
    }

    impl MockFetcher {
        fn new(response: Result<RateTable>) -> Self {
            Self {
                call_count: AtomicUsize::new(0),
                response: Mutex::new(response),
            }
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RateFetcher for MockFetcher {
        async fn fetch_rates(&self) -> Result<RateTable> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.response.lock().unwrap().clone()
        }
    }

    fn rates(sgd: f64) -> RateTable {
        [("SGD".to_string(), sgd), ("EUR".to_string(), 0.92)]
            .into_iter()
            .collect()
    }

    async fn store_with_stale_snapshot(kv: &MemoryStore, rates: RateTable) -> i64 {
        let stale = now_millis() - FRESHNESS_WINDOW.as_millis() as i64 - 1;
        let record = serde_json::to_string(&RateSnapshot::new(rates, stale)).unwrap();
        kv.set(RATES_KEY, record).await.unwrap();
        stale
    }

    #[tokio::test]
    async fn test_fetches_once_then_serves_from_store() {
        let kv = MemoryStore::new();
        let fetcher = Arc::new(MockFetcher::new(Ok(rates(1.35))));
        let cache = RateCache::new(RateStore::new(Arc::new(kv.clone())), fetcher.clone());

        let first = cache.current_rates().await.unwrap();
        assert_eq!(first.rates, rates(1.35));
        assert_eq!(fetcher.calls(), 1);

        let second = cache.current_rates().await.unwrap();
        assert_eq!(second, first);
        assert_eq!(fetcher.calls(), 1);

        // Fetched snapshot was persisted
        assert!(kv.get(RATES_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_stale_snapshot_is_refetched() {
        let kv = MemoryStore::new();
        let stale_at = store_with_stale_snapshot(&kv, rates(1.30)).await;
        let fetcher = Arc::new(MockFetcher::new(Ok(rates(1.35))));
        let cache = RateCache::new(RateStore::new(Arc::new(kv)), fetcher.clone());

        let snapshot = cache.current_rates().await.unwrap();
        assert_eq!(snapshot.rates, rates(1.35));
        assert!(snapshot.fetched_at > stale_at);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_error_propagates_by_default() {
        let kv = MemoryStore::new();
        store_with_stale_snapshot(&kv, rates(1.30)).await;
        let fetcher = Arc::new(MockFetcher::new(Err(RateError::Network(
            "offline".to_string(),
        ))));
        let cache = RateCache::new(RateStore::new(Arc::new(kv)), fetcher);

        assert_eq!(
            cache.current_rates().await,
            Err(RateError::Network("offline".to_string()))
        );
    }

    #[tokio::test]
    async fn test_serve_stale_policy_falls_back() {
        let kv = MemoryStore::new();
        let stale_at = store_with_stale_snapshot(&kv, rates(1.30)).await;
        let fetcher = Arc::new(MockFetcher::new(Err(RateError::Network(
            "offline".to_string(),
        ))));
        let cache = RateCache::new(RateStore::new(Arc::new(kv)), fetcher)
            .with_policy(StalePolicy::ServeStale);

        let snapshot = cache.current_rates().await.unwrap();
        assert_eq!(snapshot.rates, rates(1.30));
        assert_eq!(snapshot.fetched_at, stale_at);
    }

    #[tokio::test]
    async fn test_serve_stale_policy_without_snapshot_errors() {
        let fetcher = Arc::new(MockFetcher::new(Err(RateError::Format(
            "bad body".to_string(),
        ))));
        let cache = RateCache::new(RateStore::new(Arc::new(MemoryStore::new())), fetcher)
            .with_policy(StalePolicy::ServeStale);

        assert_eq!(
            cache.current_rates().await,
            Err(RateError::Format("bad body".to_string()))
        );
    }

    #[tokio::test]
    async fn test_spawn_refresh_ticks_until_cancelled() {
        let fetcher = Arc::new(MockFetcher::new(Ok(rates(1.35))));
        let cache = Arc::new(RateCache::new(
            RateStore::new(Arc::new(MemoryStore::new())),
            fetcher.clone(),
        ));

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let handle = cache.spawn_refresh(Duration::from_millis(10), move |result| {
            let _ = tx.send(result);
        });

        // First tick fires immediately, later ones serve the stored snapshot
        for _ in 0..3 {
            let update = rx.recv().await.expect("refresh update");
            assert_eq!(update.unwrap().rates, rates(1.35));
        }
        assert_eq!(fetcher.calls(), 1);

        handle.cancel().await;
        // Sender is dropped with the task, so the channel drains and closes
        while rx.recv().await.is_some() {}
    }

    #[tokio::test]
    async fn test_spawn_refresh_with_zero_interval() {
        let fetcher = Arc::new(MockFetcher::new(Ok(rates(1.35))));
        let cache = Arc::new(RateCache::new(
            RateStore::new(Arc::new(MemoryStore::new())),
            fetcher,
        ));

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let handle = cache.spawn_refresh(Duration::ZERO, move |result| {
            let _ = tx.send(result);
        });

        for _ in 0..2 {
            let update = rx.recv().await.expect("refresh update");
            assert!(update.is_ok());
        }
        handle.cancel().await;
    }
}
