use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::errors::MarketError;
use crate::mexc::types::TickerPrice;
use crate::quote::{QuoteSource, parse_price};
use crate::types::Symbol;

pub const DEFAULT_BASE_URL: &str = "https://api.mexc.com";

/// Spot ticker client for the MEXC public REST API.
#[derive(Clone)]
pub struct MexcClient {
    http: Client,
    url: String,
}

impl MexcClient {
    pub fn new(url: String, timeout: Duration) -> Result<Self, MarketError> {
        let http = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            url: url.trim_end_matches('/').to_string(),
        })
    }

    #[instrument(skip(self), fields(symbol = %symbol), level = "debug")]
    pub async fn fetch_ticker(&self, symbol: &Symbol) -> Result<TickerPrice, MarketError> {
        let url = format!("{}/api/v3/ticker/price", self.url);

        let resp = self
            .http
            .get(&url)
            .query(&[("symbol", symbol.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(MarketError::Status {
                symbol: symbol.to_string(),
                status: status.as_u16(),
            });
        }

        let ticker: TickerPrice = resp.json().await?;
        debug!(price = %ticker.price, "mexc ticker fetched");

        Ok(ticker)
    }
}

#[async_trait]
impl QuoteSource for MexcClient {
    async fn price(&self, symbol: &Symbol) -> Result<f64, MarketError> {
        let ticker = self.fetch_ticker(symbol).await?;
        parse_price(symbol, &ticker.price)
    }
}
