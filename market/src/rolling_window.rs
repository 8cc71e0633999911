use std::collections::VecDeque;

use crate::types::PriceSample;

/// How long samples are kept, relative to the newest append.
pub const DEFAULT_RETENTION_MS: u64 = 3_600_000;

/// Maximum distance between a lookup target and the sample returned for it.
pub const DEFAULT_MAX_SKEW_MS: u64 = 60_000;

/// Time-bounded, append-only buffer of samples for a single symbol.
///
/// Samples must be pushed with non-decreasing timestamps; the buffer does not sort.
/// Use [`SeriesBuffer::rewind`] before pushing after a backwards clock step.
#[derive(Debug, Clone)]
pub struct SeriesBuffer {
    /// All retained samples (ordered by time)
    values: VecDeque<PriceSample>,

    /// Maximum age
    max_age_ms: u64,
}

impl Default for SeriesBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION_MS)
    }
}

impl SeriesBuffer {
    pub fn new(max_age_ms: u64) -> Self {
        Self {
            values: VecDeque::new(),
            max_age_ms,
        }
    }

    pub fn push(&mut self, ts_ms: u64, price: f64) {
        self.values.push_back(PriceSample { ts_ms, price });
        self.evict_old(ts_ms);
    }

    /// Drops every sample newer than `ts_ms` and returns how many were dropped.
    pub fn rewind(&mut self, ts_ms: u64) -> usize {
        let before = self.values.len();
        while self.values.back().is_some_and(|s| s.ts_ms > ts_ms) {
            self.values.pop_back();
        }
        before - self.values.len()
    }

    /// Evict values older than `now_ms - max_age`
    fn evict_old(&mut self, now_ms: u64) {
        let cutoff = now_ms.saturating_sub(self.max_age_ms);
        while let Some(front) = self.values.front() {
            if front.ts_ms < cutoff {
                self.values.pop_front();
            } else {
                break;
            }
        }
    }

    /// Sample closest to `target_ms`, or `None` if even the closest one is
    /// more than `max_skew_ms` away.
    ///
    /// Scans oldest to newest and stops at the first sample past the target
    /// that is no closer than the best seen so far. Ties keep the older sample.
    pub fn nearest(&self, target_ms: u64, max_skew_ms: u64) -> Option<PriceSample> {
        let mut best: Option<(PriceSample, u64)> = None;

        for sample in &self.values {
            let diff = sample.ts_ms.abs_diff(target_ms);
            match best {
                Some((_, best_diff)) if diff >= best_diff => {
                    if sample.ts_ms > target_ms {
                        break;
                    }
                }
                _ => best = Some((*sample, diff)),
            }
        }

        best.filter(|(_, diff)| *diff <= max_skew_ms)
            .map(|(sample, _)| sample)
    }

    /// Up to `max_points` most recent samples, oldest first.
    pub fn recent(&self, max_points: usize) -> Vec<PriceSample> {
        let skip = self.values.len().saturating_sub(max_points);
        self.values.iter().skip(skip).copied().collect()
    }

    pub fn oldest(&self) -> Option<PriceSample> {
        self.values.front().copied()
    }

    pub fn latest(&self) -> Option<PriceSample> {
        self.values.back().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
