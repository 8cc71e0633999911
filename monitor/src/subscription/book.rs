//! Live subscription state read by the scheduler.
//!
//! Writes go through to the repository first and only then become visible to
//! ticks. Readers take a cloned snapshot, so a tick never observes a
//! half-applied change and never holds a lock across an await.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use common::logger::warn_if_slow;
use market::Symbol;
use parking_lot::RwLock;
use tracing::{debug, info, instrument};

use crate::alert::target::{ChannelId, UserId};
use crate::subscription::model::{ChannelSubscription, PersonalSubscription, Subscription};
use crate::subscription::repository::SubscriptionRepository;

/// Point-in-time copy of every subscription.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionSnapshot {
    pub channels: Vec<ChannelSubscription>,
    pub personal: Vec<PersonalSubscription>,
}

impl SubscriptionSnapshot {
    /// Symbols referenced by at least one subscription that needs sampling.
    pub fn active_symbols(&self) -> BTreeSet<Symbol> {
        let channels = self.channels.iter().map(|c| c as &dyn Subscription);
        let personal = self.personal.iter().map(|p| p as &dyn Subscription);

        channels
            .chain(personal)
            .filter(|s| s.wants_price())
            .map(|s| s.rule().symbol.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() && self.personal.is_empty()
    }
}

/// Anything the scheduler can read subscriptions from.
pub trait SubscriptionSource: Send + Sync {
    fn snapshot(&self) -> SubscriptionSnapshot;
}

pub struct SubscriptionBook {
    repo: Option<Arc<dyn SubscriptionRepository>>,
    channels: RwLock<HashMap<ChannelId, ChannelSubscription>>,
    personal: RwLock<HashMap<UserId, PersonalSubscription>>,
}

impl SubscriptionBook {
    pub fn new(repo: Arc<dyn SubscriptionRepository>) -> Self {
        Self {
            repo: Some(repo),
            channels: RwLock::new(HashMap::new()),
            personal: RwLock::new(HashMap::new()),
        }
    }

    /// Book with no backing store; changes live until the process exits.
    pub fn in_memory() -> Self {
        Self {
            repo: None,
            channels: RwLock::new(HashMap::new()),
            personal: RwLock::new(HashMap::new()),
        }
    }

    /// Replaces the in-memory state with whatever the repository holds.
    #[instrument(skip(self), target = "subscriptions")]
    pub async fn hydrate(&self) -> Result<()> {
        let Some(repo) = &self.repo else {
            return Ok(());
        };

        let (channels, personal) = warn_if_slow("db_load_subscriptions", Duration::from_millis(200), async {
            let channels = repo.load_channels().await?;
            let personal = repo.load_personal().await?;
            anyhow::Ok((channels, personal))
        })
        .await
        .context("failed to load subscriptions")?;

        info!(
            channels = channels.len(),
            personal = personal.len(),
            "subscriptions hydrated"
        );

        *self.channels.write() = channels.into_iter().map(|c| (c.channel_id, c)).collect();
        *self.personal.write() = personal.into_iter().map(|p| (p.user_id, p)).collect();
        Ok(())
    }

    pub fn channel(&self, id: ChannelId) -> Option<ChannelSubscription> {
        self.channels.read().get(&id).cloned()
    }

    pub fn personal(&self, id: UserId) -> Option<PersonalSubscription> {
        self.personal.read().get(&id).cloned()
    }

    #[instrument(skip_all, target = "subscriptions", fields(target_id = %sub.channel_id))]
    pub async fn upsert_channel(&self, sub: ChannelSubscription) -> Result<()> {
        sub.rule.validate()?;

        if let Some(repo) = &self.repo {
            repo.upsert_channel(&sub).await?;
        }

        debug!(symbol = %sub.rule.symbol, "channel subscription stored");
        self.channels.write().insert(sub.channel_id, sub);
        Ok(())
    }

    #[instrument(skip_all, target = "subscriptions", fields(target_id = %sub.user_id))]
    pub async fn upsert_personal(&self, sub: PersonalSubscription) -> Result<()> {
        sub.validate()?;

        if let Some(repo) = &self.repo {
            repo.upsert_personal(&sub).await?;
        }

        debug!(symbol = %sub.rule.symbol, "personal subscription stored");
        self.personal.write().insert(sub.user_id, sub);
        Ok(())
    }

    /// Applies `edit` to the channel's current subscription, or to a fresh
    /// default one, and stores the result.
    pub async fn update_channel(
        &self,
        id: ChannelId,
        edit: impl FnOnce(&mut ChannelSubscription),
    ) -> Result<ChannelSubscription> {
        let mut sub = self.channel(id).unwrap_or_else(|| ChannelSubscription::new(id));
        edit(&mut sub);
        self.upsert_channel(sub.clone()).await?;
        Ok(sub)
    }

    pub async fn update_personal(
        &self,
        id: UserId,
        edit: impl FnOnce(&mut PersonalSubscription),
    ) -> Result<PersonalSubscription> {
        let mut sub = self.personal(id).unwrap_or_else(|| PersonalSubscription::new(id));
        edit(&mut sub);
        self.upsert_personal(sub.clone()).await?;
        Ok(sub)
    }

    pub async fn remove_channel(&self, id: ChannelId) -> Result<bool> {
        if let Some(repo) = &self.repo {
            repo.delete_channel(id).await?;
        }
        Ok(self.channels.write().remove(&id).is_some())
    }

    pub async fn remove_personal(&self, id: UserId) -> Result<bool> {
        if let Some(repo) = &self.repo {
            repo.delete_personal(id).await?;
        }
        Ok(self.personal.write().remove(&id).is_some())
    }

    pub fn len(&self) -> usize {
        self.channels.read().len() + self.personal.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SubscriptionSource for SubscriptionBook {
    fn snapshot(&self) -> SubscriptionSnapshot {
        let mut channels: Vec<_> = self.channels.read().values().cloned().collect();
        let mut personal: Vec<_> = self.personal.read().values().cloned().collect();

        // stable processing order across ticks
        channels.sort_by_key(|c| c.channel_id);
        personal.sort_by_key(|p| p.user_id);

        SubscriptionSnapshot { channels, personal }
    }
}
