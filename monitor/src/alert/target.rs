use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

/// Notification destination, tagged with the id space it comes from.
///
/// Channel and user ids are never compared with each other, so a channel
/// and a user that happen to share a numeric id keep separate cooldowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TargetId {
    Channel(ChannelId),
    User(UserId),
}

impl TargetId {
    pub fn is_user(&self) -> bool {
        matches!(self, TargetId::User(_))
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetId::Channel(id) => write!(f, "channel:{id}"),
            TargetId::User(id) => write!(f, "user:{id}"),
        }
    }
}

impl From<ChannelId> for TargetId {
    fn from(id: ChannelId) -> Self {
        TargetId::Channel(id)
    }
}

impl From<UserId> for TargetId {
    fn from(id: UserId) -> Self {
        TargetId::User(id)
    }
}
