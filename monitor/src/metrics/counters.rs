use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Minimal counters for operational visibility.
#[derive(Clone, Default)]
pub struct Counters {
    pub ticks: Arc<AtomicU64>,
    pub ticks_empty: Arc<AtomicU64>,
    pub ticks_failed: Arc<AtomicU64>,

    pub fetch_failures: Arc<AtomicU64>,

    // alert pipeline
    pub alerts_triggered: Arc<AtomicU64>,
    pub alerts_suppressed: Arc<AtomicU64>,
    pub alerts_sent: Arc<AtomicU64>,
    pub alerts_failed: Arc<AtomicU64>,
    pub alerts_unreachable: Arc<AtomicU64>,

    pub renames: Arc<AtomicU64>,
    pub renames_failed: Arc<AtomicU64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub ticks: u64,
    pub ticks_empty: u64,
    pub ticks_failed: u64,
    pub fetch_failures: u64,
    pub alerts_triggered: u64,
    pub alerts_suppressed: u64,
    pub alerts_sent: u64,
    pub alerts_failed: u64,
    pub alerts_unreachable: u64,
    pub renames: u64,
    pub renames_failed: u64,
}

impl Counters {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        let get = |c: &Arc<AtomicU64>| c.load(Ordering::Relaxed);

        CounterSnapshot {
            ticks: get(&self.ticks),
            ticks_empty: get(&self.ticks_empty),
            ticks_failed: get(&self.ticks_failed),
            fetch_failures: get(&self.fetch_failures),
            alerts_triggered: get(&self.alerts_triggered),
            alerts_suppressed: get(&self.alerts_suppressed),
            alerts_sent: get(&self.alerts_sent),
            alerts_failed: get(&self.alerts_failed),
            alerts_unreachable: get(&self.alerts_unreachable),
            renames: get(&self.renames),
            renames_failed: get(&self.renames_failed),
        }
    }
}
