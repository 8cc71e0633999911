use async_trait::async_trait;

use crate::alert::payload::AlertPayload;
use crate::alert::target::{ChannelId, TargetId, UserId};
use crate::error::MonitorError;

/// A live, send-capable destination on the chat platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub id: TargetId,
    /// Current display name (channel name or user name).
    pub name: String,
}

/// Chat platform the engine delivers to.
///
/// Resolution returns `None` when the target is gone or not reachable; the
/// engine treats that as "skip this attempt", not as an error.
#[async_trait]
pub trait Platform: Send + Sync + 'static {
    async fn resolve_channel(&self, id: ChannelId) -> Option<ResolvedTarget>;

    async fn resolve_user(&self, id: UserId) -> Option<ResolvedTarget>;

    async fn send(
        &self,
        target: &ResolvedTarget,
        payload: &AlertPayload,
    ) -> Result<(), MonitorError>;

    async fn rename_channel(
        &self,
        target: &ResolvedTarget,
        new_name: &str,
    ) -> Result<(), MonitorError>;

    async fn resolve(&self, id: TargetId) -> Option<ResolvedTarget> {
        match id {
            TargetId::Channel(c) => self.resolve_channel(c).await,
            TargetId::User(u) => self.resolve_user(u).await,
        }
    }
}
