//! Foreign-exchange rates used to show prices in a secondary currency.

pub mod cache;
pub mod client;

use async_trait::async_trait;

pub use cache::RateCache;
pub use client::ExchangeRateClient;

/// Conversion rate provider. Never fails: implementations fall back to the
/// last known rate, or a fixed default when nothing was ever fetched.
#[async_trait]
pub trait FxRates: Send + Sync + 'static {
    async fn rate(&self, base: &str, quote: &str) -> f64;
}
