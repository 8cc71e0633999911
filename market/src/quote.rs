use async_trait::async_trait;

use crate::errors::MarketError;
use crate::types::Symbol;

/// Source of the latest traded price for a symbol.
///
/// Implementations must only return finite, strictly positive prices;
/// everything downstream relies on that.
#[async_trait]
pub trait QuoteSource: Send + Sync + 'static {
    async fn price(&self, symbol: &Symbol) -> Result<f64, MarketError>;

    /// Whether the symbol currently resolves to a price.
    async fn symbol_exists(&self, symbol: &Symbol) -> bool {
        self.price(symbol).await.is_ok()
    }
}

/// Parses a decimal price string, rejecting zero, negative and non-finite values.
pub fn parse_price(symbol: &Symbol, raw: &str) -> Result<f64, MarketError> {
    match raw.trim().parse::<f64>() {
        Ok(p) if p.is_finite() && p > 0.0 => Ok(p),
        _ => Err(MarketError::InvalidPrice {
            symbol: symbol.to_string(),
            raw: raw.to_string(),
        }),
    }
}
