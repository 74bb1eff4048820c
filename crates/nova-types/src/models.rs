use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Experience needed to advance one level.
pub const EXPERIENCE_PER_LEVEL: i64 = 1000;

/// `floor(experience / 1000) + 1`, 1-indexed and unbounded above.
pub fn level_for(experience: i64) -> i64 {
    experience.max(0) / EXPERIENCE_PER_LEVEL + 1
}

/// One record per platform identity. Created lazily, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub coins: i64,
    pub experience: i64,
    pub level: i64,
    pub daily_last: Option<DateTime<Utc>>,
    pub work_last: Option<DateTime<Utc>>,
    pub rob_last: Option<DateTime<Utc>>,
    pub rob_protection_until: Option<DateTime<Utc>>,
    pub double_rob_until: Option<DateTime<Utc>>,
    pub message_count: i64,
    /// Accumulated voice minutes.
    pub voice_time: i64,
    pub profile_background: String,
    pub profile_nameplate: String,
}

impl Account {
    pub fn rob_protected(&self, now: DateTime<Utc>) -> bool {
        self.rob_protection_until.is_some_and(|until| now < until)
    }

    pub fn double_rob_active(&self, now: DateTime<Utc>) -> bool {
        self.double_rob_until.is_some_and(|until| now < until)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GangRole {
    Leader,
    Agent,
    Member,
}

impl GangRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Leader => "leader",
            Self::Agent => "agent",
            Self::Member => "member",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "leader" => Some(Self::Leader),
            "agent" => Some(Self::Agent),
            "member" => Some(Self::Member),
            _ => None,
        }
    }

    /// Leaders and agents may kick members and withdraw from the vault.
    pub fn is_officer(self) -> bool {
        matches!(self, Self::Leader | Self::Agent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gang {
    pub id: i64,
    pub name: String,
    pub leader_id: String,
    pub vault: i64,
    pub level: i64,
    pub experience: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GangMember {
    pub user_id: String,
    pub username: String,
    pub gang_id: i64,
    pub role: GangRole,
    pub joined_at: DateTime<Utc>,
}

/// Columns a user leaderboard can be ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardMetric {
    Coins,
    Experience,
    MessageCount,
    VoiceTime,
}

impl LeaderboardMetric {
    /// Column name; only ever one of a fixed set, never user input.
    pub fn column(self) -> &'static str {
        match self {
            Self::Coins => "coins",
            Self::Experience => "experience",
            Self::MessageCount => "message_count",
            Self::VoiceTime => "voice_time",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Jail,
    Ban,
    Kick,
    Warn,
    Mute,
}

impl ModerationAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jail => "jail",
            Self::Ban => "ban",
            Self::Kick => "kick",
            Self::Warn => "warn",
            Self::Mute => "mute",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "jail" => Some(Self::Jail),
            "ban" => Some(Self::Ban),
            "kick" => Some(Self::Kick),
            "warn" => Some(Self::Warn),
            "mute" => Some(Self::Mute),
            _ => None,
        }
    }
}

/// Append-only administrative action against a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationRecord {
    pub id: i64,
    pub user_id: String,
    pub moderator_id: String,
    pub action: ModerationAction,
    pub reason: String,
    pub duration_secs: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Perk,
    GangPerk,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Perk => "perk",
            Self::GangPerk => "gang_perk",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "perk" => Some(Self::Perk),
            "gang_perk" => Some(Self::GangPerk),
            _ => None,
        }
    }
}

/// What buying an item does to the buyer's account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemEffect {
    RobProtection,
    DoubleRob,
    /// Platform role grant, applied by the caller. Recorded only.
    Role,
}

impl ItemEffect {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RobProtection => "rob_protection",
            Self::DoubleRob => "double_rob",
            Self::Role => "role",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "rob_protection" => Some(Self::RobProtection),
            "double_rob" => Some(Self::DoubleRob),
            "role" => Some(Self::Role),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopItem {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub kind: ItemKind,
    pub effect: ItemEffect,
    /// `None` for permanent items.
    pub duration_secs: Option<i64>,
    pub role_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: i64,
    pub user_id: String,
    pub gang_id: Option<i64>,
    pub item_id: i64,
    pub item_name: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Hug,
    Kiss,
    Cuddle,
    Pat,
    Poke,
    Slap,
    Bite,
    Yeet,
    Bonk,
    Wave,
}

impl ReactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hug => "hug",
            Self::Kiss => "kiss",
            Self::Cuddle => "cuddle",
            Self::Pat => "pat",
            Self::Poke => "poke",
            Self::Slap => "slap",
            Self::Bite => "bite",
            Self::Yeet => "yeet",
            Self::Bonk => "bonk",
            Self::Wave => "wave",
        }
    }
}

/// Side called in a coinflip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinSide {
    Heads,
    Tails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouletteColor {
    Red,
    Black,
    Green,
}
