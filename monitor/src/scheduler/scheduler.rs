//! Monitoring tick.
//!
//! One tick:
//! 1. Snapshots subscriptions and collects the symbols that need sampling.
//! 2. Fetches each symbol once, concurrently, each call under its own timeout.
//! 3. Appends every fetched price to the series store.
//! 4. Channel subscriptions: price-in-name refresh (rename throttle), then
//!    threshold evaluation and alert (cooldown gate).
//! 5. Personal subscriptions: threshold evaluation and alert.
//!
//! A symbol whose fetch fails is skipped for the rest of the tick. Failures
//! in one subscription never stop the others.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use common::logger::child_span;
use futures::future::join_all;
use market::{PriceSeriesStore, QuoteSource, Symbol};
use tracing::{Instrument, debug, field, info, instrument, trace, warn};

use crate::alert::dispatcher::{DispatchOutcome, NotificationDispatcher};
use crate::alert::gate::{CooldownGate, RenameThrottler};
use crate::alert::payload::PriceMove;
use crate::alert::target::{ChannelId, TargetId};
use crate::alert::threshold::evaluate;
use crate::deadline::within;
use crate::metrics::counters::Counters;
use crate::scheduler::rename::{next_channel_name, price_suffix};
use crate::subscription::{ChannelSubscription, Subscription, SubscriptionSource};

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// What one tick did. Used by tests and the tick log line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub symbols: usize,
    pub fetched: Vec<Symbol>,
    pub failed: Vec<Symbol>,
    /// Alerts that passed the cooldown gate, with how delivery went.
    pub alerts: Vec<(TargetId, DispatchOutcome)>,
    /// Triggered alerts held back by the cooldown gate.
    pub suppressed: Vec<TargetId>,
    pub renamed: Vec<ChannelId>,
}

impl TickReport {
    pub fn is_noop(&self) -> bool {
        self.symbols == 0
    }
}

pub struct Scheduler {
    quotes: Arc<dyn QuoteSource>,
    store: Arc<PriceSeriesStore>,
    subscriptions: Arc<dyn SubscriptionSource>,
    dispatcher: Arc<NotificationDispatcher>,

    cooldowns: Arc<CooldownGate>,
    renames: Arc<RenameThrottler>,

    /// Bound on every single external call made during a tick.
    call_timeout: Duration,

    /// Observability counters (does not affect behavior).
    counters: Counters,
}

impl Scheduler {
    pub fn new(
        quotes: Arc<dyn QuoteSource>,
        store: Arc<PriceSeriesStore>,
        subscriptions: Arc<dyn SubscriptionSource>,
        dispatcher: Arc<NotificationDispatcher>,
        cooldowns: Arc<CooldownGate>,
        renames: Arc<RenameThrottler>,
    ) -> Self {
        Self {
            quotes,
            store,
            subscriptions,
            dispatcher,
            cooldowns,
            renames,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            counters: Counters::default(),
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn with_counters(mut self, counters: Counters) -> Self {
        self.counters = counters;
        self
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn store(&self) -> &Arc<PriceSeriesStore> {
        &self.store
    }

    pub fn quotes(&self) -> &Arc<dyn QuoteSource> {
        &self.quotes
    }

    /// Runs one full tick at wall-clock time `now_ms`.
    #[instrument(skip(self), target = "scheduler", fields(symbols = field::Empty))]
    pub async fn on_tick(&self, now_ms: u64) -> anyhow::Result<TickReport> {
        Counters::incr(&self.counters.ticks);

        // Stable copy for the whole tick; edits made meanwhile show up next tick.
        let snapshot = self.subscriptions.snapshot();
        let symbols = snapshot.active_symbols();
        tracing::Span::current().record("symbols", symbols.len());

        let mut report = TickReport {
            symbols: symbols.len(),
            ..TickReport::default()
        };

        if symbols.is_empty() {
            Counters::incr(&self.counters.ticks_empty);
            debug!("no active symbols; tick is a no-op");
            return Ok(report);
        }

        let fetches = symbols.into_iter().map(|symbol| {
            let span = child_span("fetch_price");
            span.record("symbol", field::display(&symbol));
            async move {
                let price = self.fetch_price(&symbol).await;
                (symbol, price)
            }
            .instrument(span)
        });

        // Appends run one at a time, after every fetch has settled.
        let mut prices: HashMap<Symbol, f64> = HashMap::new();
        for (symbol, price) in join_all(fetches).await {
            match price {
                Some(p) => {
                    self.store.append(&symbol, p, now_ms);
                    prices.insert(symbol.clone(), p);
                    report.fetched.push(symbol);
                }
                None => {
                    Counters::incr(&self.counters.fetch_failures);
                    report.failed.push(symbol);
                }
            }
        }

        for sub in &snapshot.channels {
            let Some(&price) = prices.get(&sub.rule.symbol) else {
                continue;
            };

            let span = child_span("channel");
            span.record("symbol", field::display(&sub.rule.symbol));
            span.record("target_id", field::display(sub.channel_id));

            async {
                if sub.rename_enabled && self.refresh_channel_name(sub, price, now_ms).await {
                    report.renamed.push(sub.channel_id);
                }
                if sub.rule.monitoring_enabled {
                    self.evaluate_and_alert(sub, price, now_ms, &mut report).await;
                }
            }
            .instrument(span)
            .await;
        }

        for sub in &snapshot.personal {
            if !sub.rule.monitoring_enabled {
                continue;
            }
            let Some(&price) = prices.get(&sub.rule.symbol) else {
                continue;
            };

            let span = child_span("personal");
            span.record("symbol", field::display(&sub.rule.symbol));
            span.record("target_id", field::display(sub.user_id));

            self.evaluate_and_alert(sub, price, now_ms, &mut report)
                .instrument(span)
                .await;
        }

        info!(
            fetched = report.fetched.len(),
            failed = report.failed.len(),
            alerts = report.alerts.len(),
            suppressed = report.suppressed.len(),
            renamed = report.renamed.len(),
            "tick complete"
        );

        Ok(report)
    }

    /// Current price, or `None` if the quote failed, timed out or was unusable.
    async fn fetch_price(&self, symbol: &Symbol) -> Option<f64> {
        match within("fetch_price", self.call_timeout, self.quotes.price(symbol)).await {
            Ok(Ok(p)) if p.is_finite() && p > 0.0 => Some(p),
            Ok(Ok(p)) => {
                warn!(price = p, "quote source returned an unusable price; skipping symbol");
                None
            }
            Ok(Err(e)) => {
                warn!(error = %e, "price fetch failed; skipping symbol this tick");
                None
            }
            Err(e) => {
                warn!(error = %e, "price fetch timed out; skipping symbol this tick");
                None
            }
        }
    }

    /// Lookup, evaluate, gate and dispatch for one subscription.
    async fn evaluate_and_alert(
        &self,
        sub: &dyn Subscription,
        current: f64,
        now_ms: u64,
        report: &mut TickReport,
    ) {
        let rule = sub.rule();

        let Some(past) = self
            .store
            .price_before(rule.symbol.as_str(), rule.window_ms(), now_ms)
        else {
            trace!(window_minutes = rule.window_minutes, "no reference price yet");
            return;
        };

        let eval = evaluate(current, past, rule.threshold_percent);
        if !eval.triggered {
            trace!(change = eval.percent_change, "below threshold");
            return;
        }

        Counters::incr(&self.counters.alerts_triggered);
        let target = sub.target();

        // Claimed before sending; a failed send does not give the window back.
        if !self.cooldowns.try_acquire(target, now_ms) {
            Counters::incr(&self.counters.alerts_suppressed);
            debug!(change = eval.percent_change, "alert suppressed by cooldown");
            report.suppressed.push(target);
            return;
        }

        let mv = PriceMove {
            current,
            past,
            percent_change: eval.percent_change,
        };

        let outcome = self.dispatcher.dispatch(target, sub, mv).await;
        match outcome {
            DispatchOutcome::Sent { .. } => Counters::incr(&self.counters.alerts_sent),
            DispatchOutcome::SendFailed => Counters::incr(&self.counters.alerts_failed),
            DispatchOutcome::Unreachable => Counters::incr(&self.counters.alerts_unreachable),
        }
        report.alerts.push((target, outcome));
    }

    /// Mirrors the price in the channel name. Returns whether a rename was made.
    ///
    /// The throttle is only claimed when a rename is actually attempted; an
    /// unchanged name leaves it open.
    async fn refresh_channel_name(&self, sub: &ChannelSubscription, price: f64, now_ms: u64) -> bool {
        let channel = sub.channel_id;
        if !self.renames.is_open(channel, now_ms) {
            trace!("rename throttled");
            return false;
        }

        let platform = self.dispatcher.platform();
        let resolved = match within("resolve_channel", self.call_timeout, platform.resolve_channel(channel)).await {
            Ok(Some(r)) => r,
            Ok(None) => {
                debug!("channel unreachable; rename skipped");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "channel resolution failed; rename skipped");
                return false;
            }
        };

        let rate = self.dispatcher.display_rate().await;
        let past = self
            .store
            .price_before(sub.rule.symbol.as_str(), sub.rule.window_ms(), now_ms);
        let suffix = price_suffix(price, past, rate, self.dispatcher.currency());
        let new_name = next_channel_name(&resolved.name, &suffix);

        if new_name == resolved.name {
            trace!("channel name already current");
            return false;
        }

        if !self.renames.try_acquire(channel, now_ms) {
            return false;
        }

        match within("rename_channel", self.call_timeout, platform.rename_channel(&resolved, &new_name)).await {
            Ok(Ok(())) => {
                Counters::incr(&self.counters.renames);
                info!(old = %resolved.name, new = %new_name, "channel renamed");
                true
            }
            Ok(Err(e)) | Err(e) => {
                Counters::incr(&self.counters.renames_failed);
                warn!(error = %e, "channel rename failed; retried after the throttle interval");
                false
            }
        }
    }
}
