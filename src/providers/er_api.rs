use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::core::error::{RateError, Result};
use crate::core::rates::{BASE_CURRENCY, RateFetcher, RateTable};

pub const DEFAULT_BASE_URL: &str = "https://open.er-api.com/v6";

/// Fetches USD-based rates from the ExchangeRate-API open endpoint.
pub struct ErApiProvider {
    base_url: String,
    client: reqwest::Client,
}

impl ErApiProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("fxconv/1.0")
            .build()
            .map_err(|e| RateError::Network(format!("Failed to build HTTP client: {e}")))?;
        Ok(ErApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    result: Option<String>,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    rates: Option<HashMap<String, f64>>,
}

#[async_trait]
impl RateFetcher for ErApiProvider {
    #[instrument(name = "ErApiRateFetch", skip(self))]
    async fn fetch_rates(&self) -> Result<RateTable> {
        let url = format!("{}/latest/{}", self.base_url, BASE_CURRENCY);
        debug!("Requesting rates from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RateError::Network(format!("Request error: {e} for URL: {url}")))?;

        if !response.status().is_success() {
            return Err(RateError::Network(format!(
                "HTTP error: {} for URL: {}",
                response.status(),
                url
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| RateError::Network(format!("Failed to read response body: {e}")))?;

        let data: LatestRatesResponse = serde_json::from_str(&text)
            .map_err(|e| RateError::Format(format!("Failed to parse JSON response: {e}")))?;

        if data.result.as_deref() == Some("error") {
            return Err(RateError::Format(format!(
                "Provider returned error: {}",
                data.error_type.as_deref().unwrap_or("unknown")
            )));
        }

        let rates = RateTable::new(
            data.rates
                .ok_or_else(|| RateError::Format("Response has no rates field".to_string()))?,
        );
        rates.validate()?;
        debug!(currencies = rates.len(), "Received rates");

        Ok(rates)
    }
}
