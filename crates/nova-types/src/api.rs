use serde::{Deserialize, Serialize};

use crate::models::{
    CoinSide, GangRole, ItemKind, LeaderboardMetric, ModerationAction, ReactionKind,
    RouletteColor,
};

// -- Accounts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnsureAccountRequest {
    pub username: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AmountRequest {
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomizeProfileRequest {
    pub background: Option<String>,
    pub nameplate: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub metric: LeaderboardMetric,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    10
}

// -- Transfers --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GiveRequest {
    pub recipient_id: String,
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RobRequest {
    pub target_id: String,
}

// -- Wagers --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoinflipRequest {
    pub stake: i64,
    pub call: CoinSide,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiceRequest {
    pub stake: i64,
    pub guess: u8,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StakeRequest {
    pub stake: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouletteRequest {
    pub stake: i64,
    pub bet: RouletteColor,
}

// -- Gangs --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GangNameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromoteRequest {
    pub target_id: String,
    pub role: GangRole,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetRequest {
    pub target_id: String,
}

// -- Activity --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObservedMessageRequest {
    pub user_id: String,
    pub username: String,
    pub channel_id: String,
    #[serde(default)]
    pub is_bot: bool,
}

/// A voice-state change as the platform reports it. `None` means disconnected.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoiceStateRequest {
    pub user_id: String,
    pub username: String,
    pub old_channel_id: Option<String>,
    pub new_channel_id: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClaimDropRequest {
    pub user_id: String,
    pub username: String,
}

// -- Shop --

#[derive(Debug, Deserialize)]
pub struct ShopQuery {
    pub kind: Option<ItemKind>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PurchaseRequest {
    pub item_id: i64,
}

// -- Moderation --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModerationRequest {
    pub user_id: String,
    pub moderator_id: String,
    pub action: ModerationAction,
    pub reason: String,
    pub duration_secs: Option<i64>,
}

// -- Reactions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReactionRequest {
    pub actor_id: String,
    pub target_id: String,
    pub kind: ReactionKind,
}

#[derive(Debug, Deserialize)]
pub struct ReactionQuery {
    pub kind: ReactionKind,
}

// -- Errors --

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<i64>,
}
