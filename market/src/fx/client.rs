use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use common::time::now_ms;

use crate::errors::MarketError;
use crate::fx::{FxRates, RateCache};

pub const DEFAULT_BASE_URL: &str = "https://api.exchangerate-api.com/v4/latest";
pub const DEFAULT_FALLBACK_RATE: f64 = 150.0;

#[derive(Debug, Deserialize)]
struct RateTable {
    rates: HashMap<String, f64>,
}

/// Cached client for a `GET {url}/{base}` latest-rates endpoint.
pub struct ExchangeRateClient {
    http: Client,
    url: String,
    cache: Mutex<RateCache>,
    fallback: f64,
}

impl ExchangeRateClient {
    pub fn new(
        url: String,
        timeout: Duration,
        refresh: Duration,
        fallback: f64,
    ) -> Result<Self, MarketError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            url: url.trim_end_matches('/').to_string(),
            cache: Mutex::new(RateCache::new(refresh.as_millis() as u64)),
            fallback,
        })
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch(&self, base: &str, quote: &str) -> Result<f64, MarketError> {
        let url = format!("{}/{}", self.url, base.to_ascii_uppercase());
        let table: RateTable = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        table
            .rates
            .get(&quote.to_ascii_uppercase())
            .copied()
            .filter(|r| r.is_finite() && *r > 0.0)
            .ok_or_else(|| MarketError::MissingRate {
                base: base.to_string(),
                quote: quote.to_string(),
            })
    }
}

#[async_trait]
impl FxRates for ExchangeRateClient {
    async fn rate(&self, base: &str, quote: &str) -> f64 {
        let now = now_ms();
        let cached = self.cache.lock().fresh(base, quote, now);
        if let Some(rate) = cached {
            return rate;
        }

        match self.fetch(base, quote).await {
            Ok(rate) => {
                debug!(base, quote, rate, "fx rate refreshed");
                self.cache.lock().store(base, quote, rate, now);
                rate
            }
            Err(e) => {
                let last_known = self.cache.lock().last_known(base, quote);
                let fallback = last_known.unwrap_or(self.fallback);
                warn!(error = %e, base, quote, fallback, "fx refresh failed; using fallback rate");
                fallback
            }
        }
    }
}
