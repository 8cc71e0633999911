use std::time::Duration;

use market::MarketError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    #[error("chart render failed: {0}")]
    Chart(String),

    #[error("platform call failed: {0}")]
    Platform(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid subscription: {0}")]
    InvalidSubscription(String),

    #[error("monitor is already running")]
    AlreadyRunning,

    #[error(transparent)]
    Market(#[from] MarketError),
}
