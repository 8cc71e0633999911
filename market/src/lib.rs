pub mod errors;
pub mod fx;
pub mod mexc;
pub mod quote;
pub mod rolling_window;
pub mod series_store;
pub mod types;

pub use errors::MarketError;
pub use fx::{ExchangeRateClient, FxRates};
pub use mexc::MexcClient;
pub use quote::QuoteSource;
pub use series_store::PriceSeriesStore;
pub use types::{PriceSample, Symbol};
