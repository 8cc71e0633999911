mod support;

use market::Symbol;
use monitor::alert::{ChannelId, DispatchOutcome, TargetId, UserId};
use monitor::subscription::ChannelSubscription;
use support::*;

/// Arbitrary wall-clock origin; keeps `now - window` away from zero.
const T0: u64 = 1_700_000_000_000;

const CH1: TargetId = TargetId::Channel(ChannelId(1));
const CH2: TargetId = TargetId::Channel(ChannelId(2));
const CH3: TargetId = TargetId::Channel(ChannelId(3));
const U1: TargetId = TargetId::User(UserId(1));

async fn tick(h: &Harness, at_ms: u64) -> monitor::scheduler::TickReport {
    h.scheduler.on_tick(at_ms).await.unwrap()
}

#[tokio::test]
async fn six_percent_move_over_five_minutes_sends_exactly_one_alert() {
    let h = Harness::new().with_channel_named(1, "x-price");
    h.book.upsert_channel(channel(1, "X", 5, 5.0)).await.unwrap();

    h.quotes.set("X", 100.0);
    let r = tick(&h, T0).await;
    assert!(r.alerts.is_empty(), "no reference price on the first tick");

    let r = tick(&h, T0 + 300 * SEC).await;
    assert!(r.alerts.is_empty(), "flat price does not trigger");

    h.quotes.set("X", 106.0);
    let r = tick(&h, T0 + 305 * SEC).await;

    assert_eq!(r.alerts, vec![(CH1, DispatchOutcome::Sent { with_chart: true })]);
    assert_eq!(h.platform.sent_to(), vec![CH1]);

    let sent = h.platform.sent.lock();
    let payload = &sent[0].1;
    assert!(payload.title.starts_with("X "));
    assert!(payload.title.ends_with("6.00%"));

    // three samples recorded, all of them charted
    assert_eq!(*h.charts.requests.lock(), vec![3]);
}

#[tokio::test]
async fn cooldown_suppresses_repeat_alerts_until_it_elapses() {
    let h = Harness::new().with_channel_named(1, "btc");
    h.book.upsert_channel(channel(1, "BTCUSDT", 1, 5.0)).await.unwrap();

    h.quotes.set("BTCUSDT", 100.0);
    tick(&h, T0).await;

    h.quotes.set("BTCUSDT", 110.0);
    let r = tick(&h, T0 + MIN).await;
    assert_eq!(r.alerts.len(), 1);

    h.quotes.set("BTCUSDT", 121.0);
    let r = tick(&h, T0 + MIN + 15 * SEC).await;
    assert!(r.alerts.is_empty());
    assert_eq!(r.suppressed, vec![CH1]);

    h.quotes.set("BTCUSDT", 133.0);
    let r = tick(&h, T0 + 2 * MIN).await;
    assert_eq!(r.alerts.len(), 1, "cooldown reopens after 60s");
    assert_eq!(h.platform.sent_to(), vec![CH1, CH1]);
}

// The cooldown is claimed before the send. A failed send must not be
// retried on the next tick; doing so would spam targets during outages.
#[tokio::test]
async fn failed_send_still_claims_the_cooldown() {
    let h = Harness::new().with_channel_named(1, "btc");
    h.book.upsert_channel(channel(1, "BTCUSDT", 1, 5.0)).await.unwrap();
    h.platform.fail_sends(true);

    h.quotes.set("BTCUSDT", 100.0);
    tick(&h, T0).await;
    h.quotes.set("BTCUSDT", 110.0);
    let r = tick(&h, T0 + MIN).await;
    assert_eq!(r.alerts, vec![(CH1, DispatchOutcome::SendFailed)]);

    h.platform.fail_sends(false);
    let r = tick(&h, T0 + MIN + 15 * SEC).await;
    assert!(r.alerts.is_empty());
    assert_eq!(r.suppressed, vec![CH1]);
    assert_eq!(h.platform.sent.lock().len(), 1, "exactly one attempt");
}

#[tokio::test]
async fn unreachable_target_is_skipped_but_keeps_the_claim() {
    let h = Harness::new();
    h.book.upsert_personal(personal(1, "BTCUSDT", 1, 5.0)).await.unwrap();
    h.platform.make_unreachable(U1);

    h.quotes.set("BTCUSDT", 100.0);
    tick(&h, T0).await;
    h.quotes.set("BTCUSDT", 110.0);
    let r = tick(&h, T0 + MIN).await;

    assert_eq!(r.alerts, vec![(U1, DispatchOutcome::Unreachable)]);
    assert!(h.platform.sent.lock().is_empty());
    assert_eq!(h.cooldowns.last_acquired(U1), Some(T0 + MIN));
}

#[tokio::test]
async fn failing_symbol_does_not_block_other_symbols() {
    let h = Harness::new().with_channel_named(2, "z");
    h.book.upsert_channel(channel(1, "Y", 1, 5.0)).await.unwrap();
    h.book.upsert_channel(channel(2, "Z", 1, 5.0)).await.unwrap();

    h.quotes.fail("Y");
    h.quotes.set("Z", 10.0);
    tick(&h, T0).await;

    h.quotes.set("Z", 12.0);
    let r = tick(&h, T0 + MIN).await;

    assert_eq!(r.failed, vec![Symbol::new("Y")]);
    assert_eq!(r.fetched, vec![Symbol::new("Z")]);
    assert_eq!(r.alerts, vec![(CH2, DispatchOutcome::Sent { with_chart: false })]);
    assert!(h.store.latest("Y").is_none());
}

#[tokio::test]
async fn channel_and_personal_cooldowns_are_independent() {
    let h = Harness::new().with_channel_named(1, "btc");
    h.book.upsert_channel(channel(1, "BTCUSDT", 1, 5.0)).await.unwrap();
    h.book.upsert_personal(personal(1, "BTCUSDT", 1, 5.0)).await.unwrap();

    h.quotes.set("BTCUSDT", 100.0);
    tick(&h, T0).await;
    h.quotes.set("BTCUSDT", 90.0);
    let r = tick(&h, T0 + MIN).await;

    // same numeric id, different target kinds
    let targets: Vec<_> = r.alerts.iter().map(|(t, _)| *t).collect();
    assert_eq!(targets, vec![CH1, U1]);
    assert!(r.suppressed.is_empty());
}

#[tokio::test]
async fn symbol_shared_by_many_subscriptions_is_fetched_once() {
    let h = Harness::new();
    h.book.upsert_channel(channel(1, "BTCUSDT", 5, 2.0)).await.unwrap();
    h.book.upsert_channel(channel(2, "BTCUSDT", 10, 3.0)).await.unwrap();
    h.book.upsert_personal(personal(3, "btcusdt", 5, 2.0)).await.unwrap();
    h.quotes.set("BTCUSDT", 1.0);

    let r = tick(&h, T0).await;

    assert_eq!(r.symbols, 1);
    assert_eq!(h.quotes.calls(), 1);
    assert_eq!(h.store.recent("BTCUSDT", 10).len(), 1);
}

#[tokio::test]
async fn tick_without_active_subscriptions_is_a_noop() {
    let h = Harness::new();
    h.book
        .upsert_channel(ChannelSubscription::new(ChannelId(1)))
        .await
        .unwrap();

    let r = tick(&h, T0).await;

    assert!(r.is_noop());
    assert_eq!(h.quotes.calls(), 0);
    assert_eq!(h.scheduler.counters().snapshot().ticks_empty, 1);
}

#[tokio::test]
async fn move_below_threshold_does_not_touch_the_cooldown() {
    let h = Harness::new().with_channel_named(1, "btc");
    h.book.upsert_channel(channel(1, "BTCUSDT", 1, 5.0)).await.unwrap();

    h.quotes.set("BTCUSDT", 100.0);
    tick(&h, T0).await;
    h.quotes.set("BTCUSDT", 104.0);
    let r = tick(&h, T0 + MIN).await;

    assert!(r.alerts.is_empty() && r.suppressed.is_empty());
    assert_eq!(h.cooldowns.last_acquired(CH1), None);
}

/* =========================
Channel rename
========================= */

// A wall clock that jumped ahead and was then corrected must not hide
// later history from lookups.
#[tokio::test]
async fn backwards_clock_step_does_not_hide_history() {
    let h = Harness::new().with_channel_named(1, "x");
    h.book.upsert_channel(channel(1, "X", 1, 5.0)).await.unwrap();

    h.quotes.set("X", 100.0);
    tick(&h, T0).await;
    tick(&h, T0 + 600 * SEC).await;
    for s in (200..=260).step_by(15) {
        let r = tick(&h, T0 + s * SEC).await;
        assert!(r.alerts.is_empty());
    }

    assert_eq!(h.store.nearest("X", T0 + 215 * SEC), Some(100.0));

    h.quotes.set("X", 120.0);
    let r = tick(&h, T0 + 275 * SEC).await;
    assert_eq!(r.alerts, vec![(CH1, DispatchOutcome::Sent { with_chart: true })]);
}

#[tokio::test]
async fn edits_during_a_tick_apply_from_the_next_tick() {
    let h = Harness::new()
        .with_channel_named(1, "one")
        .with_channel_named(2, "two")
        .with_channel_named(3, "three");
    h.book.upsert_channel(channel(1, "X", 1, 5.0)).await.unwrap();
    h.book.upsert_channel(channel(2, "X", 1, 5.0)).await.unwrap();

    h.quotes.set("X", 100.0);
    tick(&h, T0).await;

    let book = h.book.clone();
    h.quotes.on_next_fetch(move || {
        Box::pin(async move {
            book.remove_channel(ChannelId(2)).await.unwrap();
            book.upsert_channel(channel(3, "X", 1, 5.0)).await.unwrap();
        })
    });

    h.quotes.set("X", 110.0);
    let r = tick(&h, T0 + MIN).await;

    // the in-flight tick still sees the subscriptions it started with
    let targets: Vec<TargetId> = r.alerts.iter().map(|(t, _)| *t).collect();
    assert_eq!(targets, vec![CH1, CH2]);
    assert!(h.book.channel(ChannelId(2)).is_none());
    assert!(h.book.channel(ChannelId(3)).is_some());

    h.quotes.set("X", 121.0);
    let r = tick(&h, T0 + 2 * MIN).await;
    let targets: Vec<TargetId> = r.alerts.iter().map(|(t, _)| *t).collect();
    assert!(targets.contains(&CH3));
    assert!(!targets.contains(&CH2));
}

fn rename_only(id: u64, symbol: &str) -> ChannelSubscription {
    let mut c = ChannelSubscription::new(ChannelId(id));
    c.rule.symbol = Symbol::new(symbol);
    c.rename_enabled = true;
    c
}

#[tokio::test]
async fn rename_is_throttled_per_channel() {
    let h = Harness::new().with_channel_named(5, "btc");
    h.book.upsert_channel(rename_only(5, "BTCUSDT")).await.unwrap();

    h.quotes.set("BTCUSDT", 2.0);
    let r = tick(&h, T0).await;
    assert_eq!(r.renamed, vec![ChannelId(5)]);
    assert_eq!(h.platform.channel_name(5).as_deref(), Some("btc (¥300.00)"));
    assert!(r.alerts.is_empty(), "rename-only channels never alert");

    h.quotes.set("BTCUSDT", 2.1);
    let r = tick(&h, T0 + 15 * SEC).await;
    assert!(r.renamed.is_empty());

    let r = tick(&h, T0 + 600 * SEC).await;
    assert_eq!(r.renamed, vec![ChannelId(5)]);
    assert_eq!(h.platform.channel_name(5).as_deref(), Some("btc (¥315.00)"));
}

#[tokio::test]
async fn rename_shows_delta_once_history_exists() {
    let h = Harness::new().with_channel_named(5, "btc");
    let mut sub = rename_only(5, "BTCUSDT");
    sub.rule.window_minutes = 10;
    h.book.upsert_channel(sub).await.unwrap();

    h.quotes.set("BTCUSDT", 2.0);
    tick(&h, T0).await;

    h.quotes.set("BTCUSDT", 2.1);
    tick(&h, T0 + 600 * SEC).await;

    assert_eq!(h.platform.channel_name(5).as_deref(), Some("btc (+¥15.00)"));
}

#[tokio::test]
async fn unchanged_name_does_not_claim_the_throttle() {
    let h = Harness::new().with_channel_named(5, "btc (¥300.00)");
    h.book.upsert_channel(rename_only(5, "BTCUSDT")).await.unwrap();

    h.quotes.set("BTCUSDT", 2.0);
    let r = tick(&h, T0).await;
    assert!(r.renamed.is_empty());
    assert_eq!(h.renames.last_acquired(ChannelId(5)), None);

    h.quotes.set("BTCUSDT", 2.1);
    let r = tick(&h, T0 + 15 * SEC).await;
    assert_eq!(r.renamed, vec![ChannelId(5)]);
}

#[tokio::test]
async fn failed_rename_keeps_the_throttle_claim() {
    let h = Harness::new().with_channel_named(5, "btc");
    h.book.upsert_channel(rename_only(5, "BTCUSDT")).await.unwrap();
    h.platform.fail_renames(true);

    h.quotes.set("BTCUSDT", 2.0);
    tick(&h, T0).await;
    h.platform.fail_renames(false);
    h.quotes.set("BTCUSDT", 2.1);
    tick(&h, T0 + 15 * SEC).await;

    assert_eq!(h.platform.renames.lock().len(), 1);
    assert_eq!(h.renames.last_acquired(ChannelId(5)), Some(T0));
}

#[tokio::test]
async fn rename_and_alert_gates_are_independent() {
    let h = Harness::new().with_channel_named(1, "btc");
    let mut sub = channel(1, "BTCUSDT", 1, 5.0);
    sub.rename_enabled = true;
    h.book.upsert_channel(sub).await.unwrap();

    h.quotes.set("BTCUSDT", 100.0);
    let r = tick(&h, T0).await;
    assert_eq!(r.renamed.len(), 1);

    h.quotes.set("BTCUSDT", 110.0);
    let r = tick(&h, T0 + MIN).await;
    assert!(r.renamed.is_empty(), "rename still throttled");
    assert_eq!(r.alerts.len(), 1, "alert gate unaffected by rename throttle");
}

/* =========================
Timeouts
========================= */

#[tokio::test(start_paused = true)]
async fn hung_quote_times_out_without_blocking_other_symbols() {
    let h = Harness::new();
    h.book.upsert_channel(channel(1, "SLOW", 1, 5.0)).await.unwrap();
    h.book.upsert_channel(channel(2, "FAST", 1, 5.0)).await.unwrap();
    h.quotes.hang("SLOW");
    h.quotes.set("FAST", 1.0);

    let r = tick(&h, T0).await;

    assert_eq!(r.failed, vec![Symbol::new("SLOW")]);
    assert_eq!(r.fetched, vec![Symbol::new("FAST")]);
    assert_eq!(h.scheduler.counters().snapshot().fetch_failures, 1);
}
