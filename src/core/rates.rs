//! Rate tables, snapshots and the fetcher abstraction

use crate::core::error::{RateError, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Reference currency every stored rate is quoted against.
pub const BASE_CURRENCY: &str = "USD";

/// Age after which a stored snapshot is no longer served.
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Default cadence for re-validating the cache, one minute past the freshness window.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(61 * 60);

/// Units of each currency per 1 USD.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateTable(HashMap<String, f64>);

impl RateTable {
    pub fn new(rates: HashMap<String, f64>) -> Self {
        Self(rates)
    }

    /// Rate of `code` against USD. USD itself is always 1 whether or not it is stored.
    pub fn rate(&self, code: &str) -> Option<f64> {
        if code == BASE_CURRENCY {
            return Some(self.0.get(code).copied().unwrap_or(1.0));
        }
        self.0.get(code).copied()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.rate(code).is_some()
    }

    /// Currency codes in sorted order, including USD.
    pub fn currencies(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.0.keys().cloned().collect();
        if !self.0.contains_key(BASE_CURRENCY) {
            codes.push(BASE_CURRENCY.to_string());
        }
        codes.sort();
        codes
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rejects empty tables and any rate that is not a strictly positive finite number.
    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(RateError::Format("rates mapping is empty".to_string()));
        }
        match self
            .0
            .iter()
            .find(|(_, rate)| !rate.is_finite() || **rate <= 0.0)
        {
            Some((code, rate)) => Err(RateError::Format(format!(
                "invalid rate {rate} for currency {code}"
            ))),
            None => Ok(()),
        }
    }
}

impl FromIterator<(String, f64)> for RateTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A rate table paired with the time (ms since epoch) it was stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    pub rates: RateTable,
    #[serde(rename = "timestamp")]
    pub fetched_at: i64,
}

impl RateSnapshot {
    pub fn new(rates: RateTable, fetched_at: i64) -> Self {
        Self { rates, fetched_at }
    }

    /// Whether the snapshot is still inside the freshness window at `now_ms`.
    pub fn is_fresh_at(&self, now_ms: i64) -> bool {
        now_ms - self.fetched_at < FRESHNESS_WINDOW.as_millis() as i64
    }

    /// `fetched_at` rendered like an HTTP date, e.g. `Tue, 14 Oct 2025 09:12:44 GMT`.
    pub fn updated_label(&self) -> String {
        Utc.timestamp_millis_opt(self.fetched_at)
            .single()
            .map(|dt| dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyPair {
    pub from: String,
    pub to: String,
}

impl CurrencyPair {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_uppercase(),
            to: to.to_uppercase(),
        }
    }
}

impl Default for CurrencyPair {
    fn default() -> Self {
        Self::new("SGD", "USD")
    }
}

/// Source of fresh USD-based rate tables. One attempt per call; retries are the caller's business.
#[async_trait]
pub trait RateFetcher: Send + Sync {
    async fn fetch_rates(&self) -> Result<RateTable>;
}

/// Milliseconds since the unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
