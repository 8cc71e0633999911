use market::Symbol;
use serde::{Deserialize, Serialize};

use crate::alert::target::{ChannelId, TargetId, UserId};
use crate::error::MonitorError;

pub const DEFAULT_SYMBOL: &str = "114514USDT";
pub const DEFAULT_WINDOW_MINUTES: u32 = 5;
pub const DEFAULT_THRESHOLD_PERCENT: f64 = 2.0;

/// Longest comparison window that can still be answered from one hour of history.
pub const MAX_WINDOW_MINUTES: u32 = 60;

/// What to watch and when to alert. Shared by both subscription kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub symbol: Symbol,
    /// How far back to look for the comparison price.
    pub window_minutes: u32,
    /// Minimum absolute percent move that raises an alert.
    pub threshold_percent: f64,
    pub monitoring_enabled: bool,
}

impl Default for AlertRule {
    fn default() -> Self {
        Self {
            symbol: Symbol::new(DEFAULT_SYMBOL),
            window_minutes: DEFAULT_WINDOW_MINUTES,
            threshold_percent: DEFAULT_THRESHOLD_PERCENT,
            monitoring_enabled: false,
        }
    }
}

impl AlertRule {
    pub fn window_ms(&self) -> u64 {
        u64::from(self.window_minutes) * 60_000
    }

    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.symbol.is_empty() {
            return Err(MonitorError::InvalidSubscription("symbol is empty".into()));
        }
        if !(1..=MAX_WINDOW_MINUTES).contains(&self.window_minutes) {
            return Err(MonitorError::InvalidSubscription(format!(
                "window must be between 1 and {MAX_WINDOW_MINUTES} minutes, got {}",
                self.window_minutes
            )));
        }
        if !self.threshold_percent.is_finite() || self.threshold_percent <= 0.0 {
            return Err(MonitorError::InvalidSubscription(format!(
                "threshold must be a positive percentage, got {}",
                self.threshold_percent
            )));
        }
        Ok(())
    }
}

/// Alerts posted to a channel, optionally mirroring the price in the channel name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSubscription {
    pub channel_id: ChannelId,
    /// Owning server, kept for reference only.
    pub guild_id: Option<u64>,
    pub rule: AlertRule,
    pub rename_enabled: bool,
}

impl ChannelSubscription {
    pub fn new(channel_id: ChannelId) -> Self {
        Self {
            channel_id,
            guild_id: None,
            rule: AlertRule::default(),
            rename_enabled: false,
        }
    }
}

/// Alerts sent to one user directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalSubscription {
    pub user_id: UserId,
    pub rule: AlertRule,
    /// Units held; only used to show an asset-value estimate.
    pub holdings: f64,
}

impl PersonalSubscription {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            rule: AlertRule::default(),
            holdings: 0.0,
        }
    }

    pub fn validate(&self) -> Result<(), MonitorError> {
        self.rule.validate()?;
        if !self.holdings.is_finite() || self.holdings < 0.0 {
            return Err(MonitorError::InvalidSubscription(format!(
                "holdings must be a non-negative amount, got {}",
                self.holdings
            )));
        }
        Ok(())
    }
}

/// Capabilities the engine needs from any subscription.
pub trait Subscription: Send + Sync {
    fn target(&self) -> TargetId;

    fn rule(&self) -> &AlertRule;

    /// Whether the subscription needs its symbol sampled at all.
    fn wants_price(&self) -> bool;

    fn holdings(&self) -> Option<f64> {
        None
    }
}

impl Subscription for ChannelSubscription {
    fn target(&self) -> TargetId {
        TargetId::Channel(self.channel_id)
    }

    fn rule(&self) -> &AlertRule {
        &self.rule
    }

    fn wants_price(&self) -> bool {
        self.rule.monitoring_enabled || self.rename_enabled
    }
}

impl Subscription for PersonalSubscription {
    fn target(&self) -> TargetId {
        TargetId::User(self.user_id)
    }

    fn rule(&self) -> &AlertRule {
        &self.rule
    }

    fn wants_price(&self) -> bool {
        self.rule.monitoring_enabled
    }

    fn holdings(&self) -> Option<f64> {
        Some(self.holdings)
    }
}
