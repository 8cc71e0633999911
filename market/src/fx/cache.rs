use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct CachedRate {
    rate: f64,
    fetched_ms: u64,
}

/// Last fetched rate per `(base, quote)` pair.
#[derive(Debug, Default)]
pub struct RateCache {
    entries: HashMap<(String, String), CachedRate>,
    refresh_ms: u64,
}

impl RateCache {
    pub fn new(refresh_ms: u64) -> Self {
        Self {
            entries: HashMap::new(),
            refresh_ms,
        }
    }

    /// The cached rate if it was fetched less than `refresh_ms` ago.
    pub fn fresh(&self, base: &str, quote: &str, now_ms: u64) -> Option<f64> {
        self.entries
            .get(&key(base, quote))
            .filter(|c| now_ms.saturating_sub(c.fetched_ms) < self.refresh_ms)
            .map(|c| c.rate)
    }

    /// The cached rate regardless of age.
    pub fn last_known(&self, base: &str, quote: &str) -> Option<f64> {
        self.entries.get(&key(base, quote)).map(|c| c.rate)
    }

    pub fn store(&mut self, base: &str, quote: &str, rate: f64, now_ms: u64) {
        self.entries.insert(
            key(base, quote),
            CachedRate {
                rate,
                fetched_ms: now_ms,
            },
        );
    }
}

fn key(base: &str, quote: &str) -> (String, String) {
    (base.to_ascii_uppercase(), quote.to_ascii_uppercase())
}
