//! In-memory price history for every tracked symbol.
//!
//! One `SeriesBuffer` per symbol, retained for one hour. All operations are
//! synchronous and hold the lock only for the duration of a single call.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{trace, warn};

use crate::rolling_window::{DEFAULT_MAX_SKEW_MS, DEFAULT_RETENTION_MS, SeriesBuffer};
use crate::types::{PriceSample, Symbol};

pub struct PriceSeriesStore {
    series: RwLock<HashMap<Symbol, SeriesBuffer>>,
    retention_ms: u64,
    max_skew_ms: u64,
}

impl Default for PriceSeriesStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceSeriesStore {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_RETENTION_MS, DEFAULT_MAX_SKEW_MS)
    }

    pub fn with_limits(retention_ms: u64, max_skew_ms: u64) -> Self {
        Self {
            series: RwLock::new(HashMap::new()),
            retention_ms,
            max_skew_ms,
        }
    }

    /// Records `price` at `now_ms` and evicts everything older than the retention window.
    ///
    /// Timestamps are expected to be non-decreasing per symbol. If `now_ms` is
    /// older than the newest sample, the newer samples are discarded first.
    pub fn append(&self, symbol: &Symbol, price: f64, now_ms: u64) {
        debug_assert!(price.is_finite() && price > 0.0, "price must be positive");

        let mut series = self.series.write();
        let buffer = series
            .entry(symbol.clone())
            .or_insert_with(|| SeriesBuffer::new(self.retention_ms));

        // A backwards clock step invalidates samples stamped in the "future";
        // the newest reading wins so the buffer stays ordered.
        if buffer.latest().is_some_and(|last| now_ms < last.ts_ms) {
            let dropped = buffer.rewind(now_ms);
            warn!(%symbol, now_ms, dropped, "clock stepped backwards; discarded newer samples");
        }

        buffer.push(now_ms, price);
        trace!(%symbol, price, retained = buffer.len(), "price appended");
    }

    /// Price of the sample closest to `target_ms`, if one lies within the skew bound.
    pub fn nearest(&self, symbol: &str, target_ms: u64) -> Option<f64> {
        self.nearest_sample(symbol, target_ms).map(|s| s.price)
    }

    pub fn nearest_sample(&self, symbol: &str, target_ms: u64) -> Option<PriceSample> {
        self.series
            .read()
            .get(symbol)
            .and_then(|b| b.nearest(target_ms, self.max_skew_ms))
    }

    /// Price roughly `window_ms` before `now_ms`.
    pub fn price_before(&self, symbol: &str, window_ms: u64, now_ms: u64) -> Option<f64> {
        self.nearest(symbol, now_ms.saturating_sub(window_ms))
    }

    /// Up to `max_points` most recent samples in chronological order.
    pub fn recent(&self, symbol: &str, max_points: usize) -> Vec<PriceSample> {
        self.series
            .read()
            .get(symbol)
            .map(|b| b.recent(max_points))
            .unwrap_or_default()
    }

    pub fn latest(&self, symbol: &str) -> Option<PriceSample> {
        self.series.read().get(symbol).and_then(SeriesBuffer::latest)
    }

    /// Number of symbols that have ever been sampled.
    pub fn symbol_count(&self) -> usize {
        self.series.read().len()
    }
}
