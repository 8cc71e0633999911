//! Alert delivery.
//!
//! The dispatcher is only reached after the cooldown gate admitted the
//! target, so by the time anything here fails the cooldown window is
//! already claimed. Failures are logged and never retried.

use std::sync::Arc;
use std::time::Duration;

use market::{FxRates, PriceSeriesStore, Symbol};
use tracing::{debug, info, instrument, warn};

use crate::alert::chart::{CHART_HISTORY_POINTS, ChartRenderer, MAX_CHART_POINTS, downsample};
use crate::alert::payload::{AlertContext, BASE_CURRENCY, DisplayCurrency, PriceMove, compose};
use crate::alert::platform::Platform;
use crate::alert::target::TargetId;
use crate::deadline::within;
use crate::subscription::Subscription;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent { with_chart: bool },
    /// Target could not be resolved; nothing was sent.
    Unreachable,
    SendFailed,
}

pub struct NotificationDispatcher {
    platform: Arc<dyn Platform>,
    fx: Arc<dyn FxRates>,
    charts: Arc<dyn ChartRenderer>,
    store: Arc<PriceSeriesStore>,
    currency: DisplayCurrency,

    /// Used only when the FX call itself hangs past `call_timeout`.
    fallback_rate: f64,
    call_timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(
        platform: Arc<dyn Platform>,
        fx: Arc<dyn FxRates>,
        charts: Arc<dyn ChartRenderer>,
        store: Arc<PriceSeriesStore>,
        currency: DisplayCurrency,
        call_timeout: Duration,
    ) -> Self {
        Self {
            platform,
            fx,
            charts,
            store,
            currency,
            fallback_rate: market::fx::client::DEFAULT_FALLBACK_RATE,
            call_timeout,
        }
    }

    pub fn with_fallback_rate(mut self, rate: f64) -> Self {
        self.fallback_rate = rate;
        self
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    pub fn currency(&self) -> &DisplayCurrency {
        &self.currency
    }

    /// USD to display-currency rate.
    pub async fn display_rate(&self) -> f64 {
        within(
            "fx_rate",
            self.call_timeout,
            self.fx.rate(BASE_CURRENCY, &self.currency.code),
        )
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, fallback = self.fallback_rate, "fx lookup timed out");
            self.fallback_rate
        })
    }

    /// Resolves `target`, composes the alert for `sub` and sends it.
    #[instrument(
        skip_all,
        fields(target_id = %target, symbol = %sub.rule().symbol, change = mv.percent_change)
    )]
    pub async fn dispatch(
        &self,
        target: TargetId,
        sub: &dyn Subscription,
        mv: PriceMove,
    ) -> DispatchOutcome {
        let resolved = match within("resolve_target", self.call_timeout, self.platform.resolve(target)).await {
            Ok(Some(r)) => r,
            Ok(None) => {
                debug!("target unreachable; alert dropped");
                return DispatchOutcome::Unreachable;
            }
            Err(e) => {
                warn!(error = %e, "target resolution failed; alert dropped");
                return DispatchOutcome::Unreachable;
            }
        };

        let rate = self.display_rate().await;
        let rule = sub.rule();
        let ctx = AlertContext {
            symbol: &rule.symbol,
            window_minutes: rule.window_minutes,
            threshold_percent: rule.threshold_percent,
            holdings: sub.holdings(),
            direct: target.is_user(),
        };

        let mut payload = compose(&ctx, &mv, rate, &self.currency);
        payload.chart_png = self.render_chart(&rule.symbol).await;
        let with_chart = payload.chart_png.is_some();

        match within("send_alert", self.call_timeout, self.platform.send(&resolved, &payload)).await {
            Ok(Ok(())) => {
                info!(target_name = %resolved.name, with_chart, "alert sent");
                DispatchOutcome::Sent { with_chart }
            }
            Ok(Err(e)) | Err(e) => {
                warn!(error = %e, "alert send failed; not retried");
                DispatchOutcome::SendFailed
            }
        }
    }

    /// Best-effort chart of recent history; `None` means a text-only alert.
    async fn render_chart(&self, symbol: &Symbol) -> Option<Vec<u8>> {
        let history = self.store.recent(symbol.as_str(), CHART_HISTORY_POINTS);
        if history.len() <= 2 {
            return None;
        }

        let points = downsample(&history, MAX_CHART_POINTS);
        match within("render_chart", self.call_timeout, self.charts.render(&points, symbol.as_str())).await {
            Ok(Ok(png)) => Some(png),
            Ok(Err(e)) | Err(e) => {
                warn!(error = %e, "chart unavailable; sending text-only alert");
                None
            }
        }
    }
}
