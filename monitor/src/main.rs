use std::sync::Arc;

use common::logger::init_logger;
use market::{ExchangeRateClient, MexcClient, PriceSeriesStore};
use monitor::{
    PriceMonitor,
    alert::{
        NotificationDispatcher, RateGate,
        chart::QuickChartClient,
        payload::DisplayCurrency,
    },
    config::AppConfig,
    console::ConsolePlatform,
    db::Db,
    metrics::Counters,
    scheduler::Scheduler,
    subscription::{SqlxSubscriptionRepository, SubscriptionBook},
};

/// Connects the subscription DB, runs migrations and loads every subscription.
async fn init_subscriptions(cfg: &AppConfig) -> anyhow::Result<Arc<SubscriptionBook>> {
    let db = Db::connect(&cfg.database_url).await?;
    db.migrate().await?;

    let repo = Arc::new(SqlxSubscriptionRepository::new(db.pool.clone()));
    let book = Arc::new(SubscriptionBook::new(repo));
    book.hydrate().await?;

    Ok(book)
}

fn build_dispatcher(
    cfg: &AppConfig,
    store: Arc<PriceSeriesStore>,
) -> anyhow::Result<NotificationDispatcher> {
    let fx = ExchangeRateClient::new(
        cfg.fx_api_url.clone(),
        cfg.http_timeout,
        cfg.fx_refresh,
        cfg.fx_fallback_rate,
    )?;
    let charts = QuickChartClient::new(cfg.chart_api_url.clone(), cfg.http_timeout)?;

    let dispatcher = NotificationDispatcher::new(
        Arc::new(ConsolePlatform::new()),
        Arc::new(fx),
        Arc::new(charts),
        store,
        DisplayCurrency::new(&cfg.display_currency),
        cfg.http_timeout,
    )
    .with_fallback_rate(cfg.fx_fallback_rate);

    Ok(dispatcher)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppConfig::from_env();
    init_logger("price-monitor", cfg.json_logs);

    tracing::info!("Starting price monitor...");

    let book = init_subscriptions(&cfg).await?;
    let store = Arc::new(PriceSeriesStore::new());
    let quotes = MexcClient::new(cfg.quote_api_url.clone(), cfg.http_timeout)?;
    let dispatcher = build_dispatcher(&cfg, store.clone())?;

    let scheduler = Scheduler::new(
        Arc::new(quotes),
        store,
        book,
        Arc::new(dispatcher),
        Arc::new(RateGate::alert_cooldown(cfg.alert_cooldown)),
        Arc::new(RateGate::rename_throttle(cfg.rename_interval)),
    )
    .with_call_timeout(cfg.http_timeout)
    .with_counters(Counters::default());

    let monitor = PriceMonitor::new(Arc::new(scheduler))
        .with_tick_interval(cfg.tick_interval)
        .with_call_timeout(cfg.http_timeout);

    let handle = monitor.start()?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    handle.stop().await;
    tracing::info!(counters = ?monitor.counters(), "final counters");

    Ok(())
}
