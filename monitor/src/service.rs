//! Public face of the engine: price queries for the command surface and
//! the lifecycle of the background tick loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use common::logger::{TraceId, root_span};
use common::time::{MINUTE_MS, now_ms};
use market::{PriceSample, PriceSeriesStore, QuoteSource, Symbol};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, debug, error, info, instrument, warn};

use crate::alert::threshold::evaluate;
use crate::deadline::within;
use crate::error::MonitorError;
use crate::metrics::counters::{CounterSnapshot, Counters};
use crate::scheduler::Scheduler;

const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(15);

/// Current price of a symbol next to its price one window ago.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceStatus {
    pub current: f64,
    pub past: Option<f64>,
    pub percent_change: Option<f64>,
}

pub struct PriceMonitor {
    scheduler: Arc<Scheduler>,
    tick_interval: Duration,
    call_timeout: Duration,
    running: Arc<AtomicBool>,
}

impl PriceMonitor {
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        Self {
            scheduler,
            tick_interval: DEFAULT_TICK_INTERVAL,
            call_timeout: Duration::from_secs(10),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    fn store(&self) -> &PriceSeriesStore {
        self.scheduler.store()
    }

    fn quotes(&self) -> &dyn QuoteSource {
        self.scheduler.quotes().as_ref()
    }

    /// Live quote; not cached here.
    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn current_price(&self, symbol: &Symbol) -> Option<f64> {
        match within("current_price", self.call_timeout, self.quotes().price(symbol)).await {
            Ok(Ok(p)) => Some(p),
            Ok(Err(e)) => {
                debug!(error = %e, "price unavailable");
                None
            }
            Err(e) => {
                warn!(error = %e, "price unavailable");
                None
            }
        }
    }

    /// Recorded price closest to `minutes_ago` minutes before now.
    pub fn price_at(&self, symbol: &Symbol, minutes_ago: u32) -> Option<f64> {
        self.price_at_ms(symbol, minutes_ago, now_ms())
    }

    pub fn price_at_ms(&self, symbol: &Symbol, minutes_ago: u32, now_ms: u64) -> Option<f64> {
        let target = now_ms.saturating_sub(u64::from(minutes_ago) * MINUTE_MS);
        self.store().nearest(symbol.as_str(), target)
    }

    pub fn recent_series(&self, symbol: &Symbol, max_points: usize) -> Vec<PriceSample> {
        self.store().recent(symbol.as_str(), max_points)
    }

    /// Live price compared with the recorded price `window_minutes` ago.
    /// `None` when no live price can be fetched.
    pub async fn status(&self, symbol: &Symbol, window_minutes: u32) -> Option<PriceStatus> {
        let current = self.current_price(symbol).await?;
        let past = self.price_at(symbol, window_minutes);
        let percent_change = past.map(|p| evaluate(current, p, 0.0).percent_change);

        Some(PriceStatus {
            current,
            past,
            percent_change,
        })
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.scheduler.counters().snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Spawns the tick loop. Only one loop may run per monitor.
    pub fn start(&self) -> Result<MonitorHandle, MonitorError> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(MonitorError::AlreadyRunning);
        }

        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
        let task = tokio::spawn(run_loop(
            self.scheduler.clone(),
            self.tick_interval,
            shutdown_rx,
            self.running.clone(),
        ));

        info!(interval_secs = self.tick_interval.as_secs(), "price monitor started");
        Ok(MonitorHandle { shutdown_tx, task })
    }
}

/// Owns the running tick loop.
pub struct MonitorHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Signals the loop and waits for it to exit. A tick in progress is
    /// allowed to finish.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            error!(error = %e, "monitor loop ended abnormally");
        }
        info!("price monitor stopped");
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

async fn run_loop(
    scheduler: Arc<Scheduler>,
    period: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
    running: Arc<AtomicBool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            // a dropped handle closes the channel and stops the loop too
            _ = shutdown_rx.recv() => break,
        }

        run_tick(&scheduler).await;
    }

    running.store(false, Ordering::Release);
    debug!("tick loop exited");
}

/// One tick, isolated in its own task so that a panic is contained.
async fn run_tick(scheduler: &Arc<Scheduler>) {
    let trace_id = TraceId::new();
    let span = root_span("tick", &trace_id);
    let now = now_ms();

    let sched = scheduler.clone();
    let res = tokio::spawn(async move { sched.on_tick(now).await }.instrument(span)).await;

    match res {
        Ok(Ok(report)) => {
            debug!(%trace_id, noop = report.is_noop(), "tick finished");
        }
        Ok(Err(e)) => {
            Counters::incr(&scheduler.counters().ticks_failed);
            error!(%trace_id, error = ?e, "tick failed; continuing with next tick");
        }
        Err(e) if e.is_panic() => {
            Counters::incr(&scheduler.counters().ticks_failed);
            error!(%trace_id, "tick panicked; continuing with next tick");
        }
        Err(e) => {
            Counters::incr(&scheduler.counters().ticks_failed);
            error!(%trace_id, error = %e, "tick task cancelled");
        }
    }
}
