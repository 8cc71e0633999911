use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Exchange symbol of a tradable pair, e.g. `BTCUSDT`.
///
/// Always stored upper-cased so `btcusdt` and `BTCUSDT` key the same series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// One observed price. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceSample {
    /// Observation time (ms since epoch)
    pub ts_ms: u64,
    pub price: f64,
}
