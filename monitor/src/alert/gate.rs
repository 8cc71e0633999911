//! Per-key rate limiting for side effects.
//!
//! A gate remembers when each key was last admitted. Admission is an atomic
//! check-and-set: two racing callers for the same key can never both pass
//! within one interval. State lives only in memory and starts empty.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use crate::alert::target::{ChannelId, TargetId};

pub const DEFAULT_ALERT_COOLDOWN: Duration = Duration::from_secs(60);
pub const DEFAULT_RENAME_INTERVAL: Duration = Duration::from_secs(600);

pub struct RateGate<K> {
    name: &'static str,
    interval_ms: u64,
    last: Mutex<HashMap<K, u64>>,
}

/// Admission check before every alert send, keyed by target.
pub type CooldownGate = RateGate<TargetId>;

/// Admission check before every channel rename.
pub type RenameThrottler = RateGate<ChannelId>;

impl<K> RateGate<K>
where
    K: Eq + Hash + Copy + Display,
{
    pub fn new(name: &'static str, interval: Duration) -> Self {
        Self {
            name,
            interval_ms: interval.as_millis() as u64,
            last: Mutex::new(HashMap::new()),
        }
    }

    /// Admits `key` and records `now_ms` if it has never been admitted or its
    /// last admission is at least one interval old. Otherwise leaves the
    /// state untouched and returns false.
    pub fn try_acquire(&self, key: K, now_ms: u64) -> bool {
        let mut last = self.last.lock();

        if let Some(&prev) = last.get(&key) {
            if now_ms.saturating_sub(prev) < self.interval_ms {
                trace!(gate = self.name, %key, "gate closed");
                return false;
            }
        }

        last.insert(key, now_ms);
        trace!(gate = self.name, %key, now_ms, "gate acquired");
        true
    }

    /// Whether `try_acquire` would currently succeed. Does not claim.
    pub fn is_open(&self, key: K, now_ms: u64) -> bool {
        self.last
            .lock()
            .get(&key)
            .is_none_or(|&prev| now_ms.saturating_sub(prev) >= self.interval_ms)
    }

    pub fn last_acquired(&self, key: K) -> Option<u64> {
        self.last.lock().get(&key).copied()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl RateGate<TargetId> {
    pub fn alert_cooldown(interval: Duration) -> Self {
        Self::new("alert_cooldown", interval)
    }
}

impl RateGate<ChannelId> {
    pub fn rename_throttle(interval: Duration) -> Self {
        Self::new("rename_throttle", interval)
    }
}

impl Default for RateGate<TargetId> {
    fn default() -> Self {
        Self::alert_cooldown(DEFAULT_ALERT_COOLDOWN)
    }
}

impl Default for RateGate<ChannelId> {
    fn default() -> Self {
        Self::rename_throttle(DEFAULT_RENAME_INTERVAL)
    }
}
