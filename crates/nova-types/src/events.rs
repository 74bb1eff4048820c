use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Announcements the core hands back to the platform layer for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BotEvent {
    /// A user crossed a level threshold
    LevelUp { user_id: String, level: i64 },

    /// A claimable currency drop appeared in a channel
    DropSpawned {
        drop_id: Uuid,
        channel_id: String,
        amount: i64,
        expires_at: DateTime<Utc>,
    },

    /// The first claimant took a drop
    DropClaimed {
        drop_id: Uuid,
        channel_id: String,
        user_id: String,
        amount: i64,
    },
}

impl BotEvent {
    /// Returns the channel_id if this event belongs in a specific channel.
    /// Level-ups return `None`; the caller decides where to show them.
    pub fn channel_id(&self) -> Option<&str> {
        match self {
            Self::DropSpawned { channel_id, .. } | Self::DropClaimed { channel_id, .. } => {
                Some(channel_id)
            }
            Self::LevelUp { .. } => None,
        }
    }
}
