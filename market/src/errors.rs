use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} for {symbol}")]
    Status { symbol: String, status: u16 },

    #[error("invalid price {raw:?} for {symbol}")]
    InvalidPrice { symbol: String, raw: String },

    #[error("rate {quote} missing from {base} table")]
    MissingRate { base: String, quote: String },
}
