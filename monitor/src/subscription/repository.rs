use anyhow::Result;
use async_trait::async_trait;

use crate::alert::target::{ChannelId, UserId};
use crate::subscription::model::{ChannelSubscription, PersonalSubscription};

/// Durable storage for subscriptions.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn load_channels(&self) -> Result<Vec<ChannelSubscription>>;

    async fn load_personal(&self) -> Result<Vec<PersonalSubscription>>;

    async fn upsert_channel(&self, sub: &ChannelSubscription) -> Result<()>;

    async fn upsert_personal(&self, sub: &PersonalSubscription) -> Result<()>;

    /// Returns whether a row was removed.
    async fn delete_channel(&self, id: ChannelId) -> Result<bool>;

    async fn delete_personal(&self, id: UserId) -> Result<bool>;
}
