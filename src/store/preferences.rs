use crate::core::error::Result;
use crate::core::rates::CurrencyPair;
use crate::store::KeyValueStore;
use std::sync::Arc;
use tracing::debug;

const FROM_KEY: &str = "fromCurrency";
const TO_KEY: &str = "toCurrency";

/// Remembers the last currency pair the user converted.
pub struct PairPreferences {
    store: Arc<dyn KeyValueStore>,
}

impl PairPreferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Last saved pair, with `fallback` filling in whichever side was never saved.
    pub async fn load(&self, fallback: &CurrencyPair) -> Result<CurrencyPair> {
        let from = self.store.get(FROM_KEY).await?;
        let to = self.store.get(TO_KEY).await?;
        debug!(?from, ?to, "Loaded saved currency pair");

        Ok(CurrencyPair::new(
            from.as_deref().unwrap_or(&fallback.from),
            to.as_deref().unwrap_or(&fallback.to),
        ))
    }

    pub async fn save(&self, pair: &CurrencyPair) -> Result<()> {
        self.store.set(FROM_KEY, pair.from.clone()).await?;
        self.store.set(TO_KEY, pair.to.clone()).await
    }
}
