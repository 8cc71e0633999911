use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Subscription database connection string.
    pub database_url: String,

    // =========================
    // Upstream endpoints
    // =========================
    /// Base URL of the spot ticker API.
    pub quote_api_url: String,

    /// Base URL of the latest-rates API (`{url}/{base}`).
    pub fx_api_url: String,

    /// Chart rendering endpoint (POST, returns PNG).
    pub chart_api_url: String,

    /// Timeout applied to every single external call.
    ///
    /// A hung call for one symbol or target only costs this much of a tick;
    /// there is no tick-wide deadline.
    pub http_timeout: Duration,

    // =========================
    // Scheduler
    // =========================
    /// Period of the monitoring tick.
    pub tick_interval: Duration,

    /// Minimum spacing between two alerts to the same target.
    pub alert_cooldown: Duration,

    /// Minimum spacing between two renames of the same channel.
    ///
    /// Chat platforms rate-limit channel edits far more aggressively than
    /// messages, hence the separate, coarser interval.
    pub rename_interval: Duration,

    // =========================
    // Display currency
    // =========================
    /// Secondary currency prices are converted to for display (base is USD).
    pub display_currency: String,

    /// How long a fetched FX rate is reused.
    pub fx_refresh: Duration,

    /// Rate used before any FX fetch has ever succeeded.
    pub fx_fallback_rate: f64,

    /// Emit JSON logs instead of the pretty format.
    pub json_logs: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://price_monitor.db?mode=rwc".to_string(),

            quote_api_url: market::mexc::client::DEFAULT_BASE_URL.to_string(),
            fx_api_url: market::fx::client::DEFAULT_BASE_URL.to_string(),
            chart_api_url: crate::alert::chart::DEFAULT_CHART_URL.to_string(),
            http_timeout: Duration::from_secs(10),

            tick_interval: Duration::from_secs(15),
            alert_cooldown: Duration::from_secs(60),
            rename_interval: Duration::from_secs(600),

            display_currency: "JPY".to_string(),
            fx_refresh: Duration::from_secs(3600),
            fx_fallback_rate: market::fx::client::DEFAULT_FALLBACK_RATE,

            json_logs: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; unset or unparseable
    /// keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();

        let string = |key: &str, default: String| lookup(key).unwrap_or(default);
        let secs = |key: &str, default: Duration| {
            parse_or(key, lookup(key), default.as_secs()).max(1)
        };

        Self {
            database_url: string("DATABASE_URL", d.database_url),

            quote_api_url: string("QUOTE_API_URL", d.quote_api_url),
            fx_api_url: string("FX_API_URL", d.fx_api_url),
            chart_api_url: string("CHART_API_URL", d.chart_api_url),
            http_timeout: Duration::from_secs(secs("HTTP_TIMEOUT_SECS", d.http_timeout)),

            tick_interval: Duration::from_secs(secs("TICK_INTERVAL_SECS", d.tick_interval)),
            alert_cooldown: Duration::from_secs(secs("ALERT_COOLDOWN_SECS", d.alert_cooldown)),
            rename_interval: Duration::from_secs(secs("RENAME_INTERVAL_SECS", d.rename_interval)),

            display_currency: string("DISPLAY_CURRENCY", d.display_currency).to_ascii_uppercase(),
            fx_refresh: Duration::from_secs(secs("FX_REFRESH_SECS", d.fx_refresh)),
            fx_fallback_rate: parse_or("FX_FALLBACK_RATE", lookup("FX_FALLBACK_RATE"), d.fx_fallback_rate),

            json_logs: lookup("APP_ENV").as_deref() == Some("production"),
        }
    }
}

fn parse_or<T: FromStr + Copy>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(v) => v.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %v, "unparseable config value; using default");
            default
        }),
    }
}
