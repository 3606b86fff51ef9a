use crate::core::error::{RateError, Result};
use crate::core::rates::{RateSnapshot, RateTable, now_millis};
use crate::store::KeyValueStore;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Key holding the composite `{rates, timestamp}` record.
pub const RATES_KEY: &str = "exchangeRates";

/// Owns the persisted rate snapshot and decides whether it is still fresh.
///
/// The rates and their timestamp are written as one record, so a reader can never
/// observe rates from one fetch paired with the timestamp of another.
#[derive(Clone)]
pub struct RateStore {
    store: Arc<dyn KeyValueStore>,
}

impl RateStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stores `rates` stamped with the current time and returns that timestamp.
    #[instrument(name = "RateStoreSave", skip_all, fields(currencies = rates.len()))]
    pub async fn save(&self, rates: &RateTable) -> Result<i64> {
        let snapshot = RateSnapshot::new(rates.clone(), now_millis());
        let record = serde_json::to_string(&snapshot)
            .map_err(|e| RateError::Storage(format!("Failed to serialize rates: {e}")))?;
        self.store.set(RATES_KEY, record).await?;
        debug!(timestamp = snapshot.fetched_at, "Saved rate snapshot");
        Ok(snapshot.fetched_at)
    }

    /// Returns the stored snapshot if one exists, parses and is inside the freshness window.
    pub async fn load(&self) -> Result<Option<RateSnapshot>> {
        let now = now_millis();
        Ok(self
            .load_latest()
            .await?
            .filter(|snapshot| {
                let fresh = snapshot.is_fresh_at(now);
                if !fresh {
                    debug!(
                        age_ms = now - snapshot.fetched_at,
                        "Stored rate snapshot is stale"
                    );
                }
                fresh
            }))
    }

    /// Returns the stored snapshot regardless of its age.
    pub async fn load_latest(&self) -> Result<Option<RateSnapshot>> {
        let Some(record) = self.store.get(RATES_KEY).await? else {
            debug!("No stored rate snapshot");
            return Ok(None);
        };

        match serde_json::from_str::<RateSnapshot>(&record) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!("Ignoring unparsable rate snapshot: {}", e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rates::FRESHNESS_WINDOW;
    use crate::store::MemoryStore;
    use async_trait::async_trait;

    fn rates() -> RateTable {
        [("SGD".to_string(), 1.35), ("EUR".to_string(), 0.92)]
            .into_iter()
            .collect()
    }

    async fn store_with_record(record: &str) -> RateStore {
        let kv = MemoryStore::new();
        kv.set(RATES_KEY, record.to_string()).await.unwrap();
        RateStore::new(Arc::new(kv))
    }

    #[tokio::test]
    async fn test_load_after_save_returns_same_rates() {
        let store = RateStore::new(Arc::new(MemoryStore::new()));

        let timestamp = store.save(&rates()).await.unwrap();
        let snapshot = store.load().await.unwrap().expect("snapshot should be fresh");

        assert_eq!(snapshot.rates, rates());
        assert_eq!(snapshot.fetched_at, timestamp);
    }

    #[tokio::test]
    async fn test_load_empty_store() {
        let store = RateStore::new(Arc::new(MemoryStore::new()));
        assert!(store.load().await.unwrap().is_none());
        assert!(store.load_latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_expired_snapshot() {
        let expired = now_millis() - FRESHNESS_WINDOW.as_millis() as i64 - 1;
        let record = serde_json::to_string(&RateSnapshot::new(rates(), expired)).unwrap();
        let store = store_with_record(&record).await;

        assert!(store.load().await.unwrap().is_none());

        // Still reachable for stale fallback
        let latest = store.load_latest().await.unwrap().unwrap();
        assert_eq!(latest.fetched_at, expired);
    }

    #[tokio::test]
    async fn test_load_corrupt_record() {
        let store = store_with_record("{not json").await;
        assert!(store.load().await.unwrap().is_none());

        let store = store_with_record(r#"{"rates": {"SGD": 1.35}}"#).await;
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_snapshot() {
        let store = RateStore::new(Arc::new(MemoryStore::new()));
        store.save(&rates()).await.unwrap();

        let updated: RateTable = [("SGD".to_string(), 1.40)].into_iter().collect();
        store.save(&updated).await.unwrap();

        assert_eq!(store.load().await.unwrap().unwrap().rates, updated);
    }

    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(RateError::Storage("store unavailable".to_string()))
        }

        async fn set(&self, _key: &str, _value: String) -> Result<()> {
            Err(RateError::Storage("quota exceeded".to_string()))
        }
    }

    #[tokio::test]
    async fn test_storage_errors_propagate() {
        let store = RateStore::new(Arc::new(BrokenStore));
        assert_eq!(
            store.save(&rates()).await,
            Err(RateError::Storage("quota exceeded".to_string()))
        );
        assert!(matches!(store.load().await, Err(RateError::Storage(_))));
    }
}
