#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use market::{FxRates, MarketError, PriceSeriesStore, QuoteSource, Symbol};
use monitor::alert::chart::ChartRenderer;
use monitor::alert::payload::{AlertPayload, DisplayCurrency};
use monitor::alert::{
    ChannelId, CooldownGate, NotificationDispatcher, Platform, RateGate, RenameThrottler,
    ResolvedTarget, TargetId, UserId,
};
use monitor::error::MonitorError;
use monitor::scheduler::Scheduler;
use monitor::subscription::{ChannelSubscription, PersonalSubscription, SubscriptionBook};
use parking_lot::Mutex;

pub const SEC: u64 = 1_000;
pub const MIN: u64 = 60 * SEC;

/* =========================
Quotes
========================= */

#[derive(Clone, Copy)]
enum Quote {
    Price(f64),
    Down,
    Hang,
    Panic,
}

type Hook = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

#[derive(Default)]
pub struct MockQuotes {
    quotes: Mutex<HashMap<String, Quote>>,
    calls: AtomicUsize,
    on_next_fetch: Mutex<Option<Hook>>,
}

impl MockQuotes {
    pub fn set(&self, symbol: &str, price: f64) {
        self.quotes
            .lock()
            .insert(symbol.to_ascii_uppercase(), Quote::Price(price));
    }

    pub fn fail(&self, symbol: &str) {
        self.quotes.lock().insert(symbol.to_ascii_uppercase(), Quote::Down);
    }

    pub fn hang(&self, symbol: &str) {
        self.quotes.lock().insert(symbol.to_ascii_uppercase(), Quote::Hang);
    }

    pub fn panic_on(&self, symbol: &str) {
        self.quotes.lock().insert(symbol.to_ascii_uppercase(), Quote::Panic);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Runs `hook` inside the next `price` call, before it answers.
    pub fn on_next_fetch(&self, hook: impl FnOnce() -> BoxFuture<'static, ()> + Send + 'static) {
        *self.on_next_fetch.lock() = Some(Box::new(hook));
    }
}

#[async_trait]
impl QuoteSource for MockQuotes {
    async fn price(&self, symbol: &Symbol) -> Result<f64, MarketError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let hook = self.on_next_fetch.lock().take();
        if let Some(hook) = hook {
            hook().await;
        }

        let quote = self.quotes.lock().get(symbol.as_str()).copied();
        match quote {
            Some(Quote::Price(p)) => Ok(p),
            Some(Quote::Hang) => std::future::pending().await,
            Some(Quote::Panic) => panic!("quote source exploded"),
            Some(Quote::Down) | None => Err(MarketError::InvalidPrice {
                symbol: symbol.to_string(),
                raw: "unavailable".into(),
            }),
        }
    }
}

/* =========================
Platform
========================= */

#[derive(Default)]
pub struct MockPlatform {
    channel_names: Mutex<HashMap<ChannelId, String>>,
    unreachable: Mutex<HashSet<TargetId>>,
    fail_sends: Mutex<bool>,
    fail_renames: Mutex<bool>,

    pub sent: Mutex<Vec<(TargetId, AlertPayload)>>,
    pub renames: Mutex<Vec<(ChannelId, String)>>,
}

impl MockPlatform {
    pub fn name_channel(&self, id: u64, name: &str) {
        self.channel_names.lock().insert(ChannelId(id), name.to_string());
    }

    pub fn make_unreachable(&self, id: TargetId) {
        self.unreachable.lock().insert(id);
    }

    pub fn fail_sends(&self, fail: bool) {
        *self.fail_sends.lock() = fail;
    }

    pub fn fail_renames(&self, fail: bool) {
        *self.fail_renames.lock() = fail;
    }

    pub fn sent_to(&self) -> Vec<TargetId> {
        self.sent.lock().iter().map(|(t, _)| *t).collect()
    }

    pub fn channel_name(&self, id: u64) -> Option<String> {
        self.channel_names.lock().get(&ChannelId(id)).cloned()
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn resolve_channel(&self, id: ChannelId) -> Option<ResolvedTarget> {
        if self.unreachable.lock().contains(&TargetId::Channel(id)) {
            return None;
        }
        let name = self.channel_names.lock().get(&id).cloned()?;
        Some(ResolvedTarget {
            id: TargetId::Channel(id),
            name,
        })
    }

    async fn resolve_user(&self, id: UserId) -> Option<ResolvedTarget> {
        if self.unreachable.lock().contains(&TargetId::User(id)) {
            return None;
        }
        Some(ResolvedTarget {
            id: TargetId::User(id),
            name: format!("user{}", id.0),
        })
    }

    async fn send(&self, target: &ResolvedTarget, payload: &AlertPayload) -> Result<(), MonitorError> {
        // record the attempt even when it fails
        self.sent.lock().push((target.id, payload.clone()));
        if *self.fail_sends.lock() {
            return Err(MonitorError::Platform("send rejected".into()));
        }
        Ok(())
    }

    async fn rename_channel(&self, target: &ResolvedTarget, new_name: &str) -> Result<(), MonitorError> {
        let TargetId::Channel(id) = target.id else {
            return Err(MonitorError::Platform("not a channel".into()));
        };
        self.renames.lock().push((id, new_name.to_string()));
        if *self.fail_renames.lock() {
            return Err(MonitorError::Platform("rename rejected".into()));
        }
        self.channel_names.lock().insert(id, new_name.to_string());
        Ok(())
    }
}

/* =========================
Charts + FX
========================= */

#[derive(Default)]
pub struct MockCharts {
    fail: Mutex<bool>,
    pub requests: Mutex<Vec<usize>>,
}

impl MockCharts {
    pub fn fail(&self, fail: bool) {
        *self.fail.lock() = fail;
    }
}

#[async_trait]
impl ChartRenderer for MockCharts {
    async fn render(&self, points: &[f64], _label: &str) -> Result<Vec<u8>, MonitorError> {
        self.requests.lock().push(points.len());
        if *self.fail.lock() {
            return Err(MonitorError::Chart("renderer down".into()));
        }
        Ok(vec![0x89, b'P', b'N', b'G'])
    }
}

pub struct FixedFx(pub f64);

#[async_trait]
impl FxRates for FixedFx {
    async fn rate(&self, _base: &str, _quote: &str) -> f64 {
        self.0
    }
}

/* =========================
Harness
========================= */

pub struct Harness {
    pub quotes: Arc<MockQuotes>,
    pub platform: Arc<MockPlatform>,
    pub charts: Arc<MockCharts>,
    pub store: Arc<PriceSeriesStore>,
    pub book: Arc<SubscriptionBook>,
    pub cooldowns: Arc<CooldownGate>,
    pub renames: Arc<RenameThrottler>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub scheduler: Arc<Scheduler>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_platform(MockPlatform::default())
    }

    pub fn with_platform(platform: MockPlatform) -> Self {
        let quotes = Arc::new(MockQuotes::default());
        let platform = Arc::new(platform);
        let charts = Arc::new(MockCharts::default());
        let store = Arc::new(PriceSeriesStore::new());
        let book = Arc::new(SubscriptionBook::in_memory());
        let cooldowns = Arc::new(RateGate::alert_cooldown(Duration::from_secs(60)));
        let renames = Arc::new(RateGate::rename_throttle(Duration::from_secs(600)));

        let dispatcher = Arc::new(NotificationDispatcher::new(
            platform.clone(),
            Arc::new(FixedFx(150.0)),
            charts.clone(),
            store.clone(),
            DisplayCurrency::new("JPY"),
            Duration::from_secs(1),
        ));

        let scheduler = Scheduler::new(
            quotes.clone(),
            store.clone(),
            book.clone(),
            dispatcher.clone(),
            cooldowns.clone(),
            renames.clone(),
        )
        .with_call_timeout(Duration::from_secs(1));

        Self {
            quotes,
            platform,
            charts,
            store,
            book,
            cooldowns,
            renames,
            dispatcher,
            scheduler: Arc::new(scheduler),
        }
    }
}

impl Harness {
    /// Makes channel `id` resolvable under `name`.
    pub fn with_channel_named(self, id: u64, name: &str) -> Self {
        self.platform.name_channel(id, name);
        self
    }
}

pub fn channel(id: u64, symbol: &str, window_minutes: u32, threshold: f64) -> ChannelSubscription {
    let mut c = ChannelSubscription::new(ChannelId(id));
    c.rule.symbol = Symbol::new(symbol);
    c.rule.window_minutes = window_minutes;
    c.rule.threshold_percent = threshold;
    c.rule.monitoring_enabled = true;
    c
}

pub fn personal(id: u64, symbol: &str, window_minutes: u32, threshold: f64) -> PersonalSubscription {
    let mut p = PersonalSubscription::new(UserId(id));
    p.rule.symbol = Symbol::new(symbol);
    p.rule.window_minutes = window_minutes;
    p.rule.threshold_percent = threshold;
    p.rule.monitoring_enabled = true;
    p
}
