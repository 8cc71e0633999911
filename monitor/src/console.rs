//! Log-only platform used by the bundled binary.
//!
//! Every target resolves; alerts and renames are written to the log instead
//! of a chat service. Channel names are remembered so the price-in-name
//! refresh behaves as it would against a real platform.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::info;

use crate::alert::payload::AlertPayload;
use crate::alert::platform::{Platform, ResolvedTarget};
use crate::alert::target::{ChannelId, TargetId, UserId};
use crate::error::MonitorError;

#[derive(Default)]
pub struct ConsolePlatform {
    channel_names: RwLock<HashMap<ChannelId, String>>,
}

impl ConsolePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel_name(&self, id: ChannelId) -> Option<String> {
        self.channel_names.read().get(&id).cloned()
    }
}

#[async_trait]
impl Platform for ConsolePlatform {
    async fn resolve_channel(&self, id: ChannelId) -> Option<ResolvedTarget> {
        let name = self
            .channel_names
            .write()
            .entry(id)
            .or_insert_with(|| format!("price-{}", id.0))
            .clone();

        Some(ResolvedTarget {
            id: TargetId::Channel(id),
            name,
        })
    }

    async fn resolve_user(&self, id: UserId) -> Option<ResolvedTarget> {
        Some(ResolvedTarget {
            id: TargetId::User(id),
            name: format!("user-{}", id.0),
        })
    }

    async fn send(&self, target: &ResolvedTarget, payload: &AlertPayload) -> Result<(), MonitorError> {
        let body = serde_json::to_string(payload).map_err(|e| MonitorError::Platform(e.to_string()))?;

        info!(
            target: "alerts",
            target_id = %target.id,
            title = %payload.title,
            chart = payload.chart_png.is_some(),
            payload = %body,
            "alert"
        );
        Ok(())
    }

    async fn rename_channel(&self, target: &ResolvedTarget, new_name: &str) -> Result<(), MonitorError> {
        let TargetId::Channel(id) = target.id else {
            return Err(MonitorError::Platform(format!("{} is not a channel", target.id)));
        };

        self.channel_names.write().insert(id, new_name.to_string());
        info!(target: "alerts", target_id = %target.id, name = new_name, "channel renamed");
        Ok(())
    }
}
