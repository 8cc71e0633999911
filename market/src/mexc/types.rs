use serde::Deserialize;

/// Body of `GET /api/v3/ticker/price`.
#[derive(Debug, Deserialize)]
pub struct TickerPrice {
    pub symbol: String,
    pub price: String,
}
