//! Row mapping: turns SQLite rows into nova-types models.
//! Timestamps are stored as INTEGER Unix milliseconds.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

use nova_types::models::{
    Account, Gang, GangMember, GangRole, ItemEffect, ItemKind, ModerationAction, ModerationRecord,
    Purchase, ShopItem,
};

pub fn to_millis(t: DateTime<Utc>) -> i64 {
    t.timestamp_millis()
}

pub fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn opt_time(row: &Row, col: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    Ok(row.get::<_, Option<i64>>(col)?.map(from_millis))
}

fn parse_text<T>(row: &Row, col: &str, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(col)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            Type::Text,
            format!("unexpected {} value '{}'", col, raw).into(),
        )
    })
}

pub const ACCOUNT_COLUMNS: &str = "id, username, coins, experience, level, daily_last, work_last, \
     rob_last, rob_protection_until, double_rob_until, message_count, voice_time, \
     profile_background, profile_nameplate";

pub fn account_from_row(row: &Row) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get("id")?,
        username: row.get("username")?,
        coins: row.get("coins")?,
        experience: row.get("experience")?,
        level: row.get("level")?,
        daily_last: opt_time(row, "daily_last")?,
        work_last: opt_time(row, "work_last")?,
        rob_last: opt_time(row, "rob_last")?,
        rob_protection_until: opt_time(row, "rob_protection_until")?,
        double_rob_until: opt_time(row, "double_rob_until")?,
        message_count: row.get("message_count")?,
        voice_time: row.get("voice_time")?,
        profile_background: row.get("profile_background")?,
        profile_nameplate: row.get("profile_nameplate")?,
    })
}

pub const GANG_COLUMNS: &str = "id, name, leader_id, vault, level, experience, created_at";

pub fn gang_from_row(row: &Row) -> rusqlite::Result<Gang> {
    Ok(Gang {
        id: row.get("id")?,
        name: row.get("name")?,
        leader_id: row.get("leader_id")?,
        vault: row.get("vault")?,
        level: row.get("level")?,
        experience: row.get("experience")?,
        created_at: from_millis(row.get("created_at")?),
    })
}

/// Expects `user_id, username, gang_id, role, joined_at`.
pub fn member_from_row(row: &Row) -> rusqlite::Result<GangMember> {
    Ok(GangMember {
        user_id: row.get("user_id")?,
        username: row.get("username")?,
        gang_id: row.get("gang_id")?,
        role: parse_text(row, "role", GangRole::parse)?,
        joined_at: from_millis(row.get("joined_at")?),
    })
}

pub const MODERATION_COLUMNS: &str =
    "id, user_id, moderator_id, action, reason, duration_secs, expires_at, active, created_at";

pub fn moderation_from_row(row: &Row) -> rusqlite::Result<ModerationRecord> {
    Ok(ModerationRecord {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        moderator_id: row.get("moderator_id")?,
        action: parse_text(row, "action", ModerationAction::parse)?,
        reason: row.get("reason")?,
        duration_secs: row.get("duration_secs")?,
        expires_at: opt_time(row, "expires_at")?,
        active: row.get("active")?,
        created_at: from_millis(row.get("created_at")?),
    })
}

pub const SHOP_ITEM_COLUMNS: &str = "id, name, description, price, kind, effect, duration_secs, role_id";

pub fn shop_item_from_row(row: &Row) -> rusqlite::Result<ShopItem> {
    Ok(ShopItem {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        price: row.get("price")?,
        kind: parse_text(row, "kind", ItemKind::parse)?,
        effect: parse_text(row, "effect", ItemEffect::parse)?,
        duration_secs: row.get("duration_secs")?,
        role_id: row.get("role_id")?,
    })
}

/// Expects purchase columns plus `item_name` from the joined `shop_items` row.
pub fn purchase_from_row(row: &Row) -> rusqlite::Result<Purchase> {
    Ok(Purchase {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        gang_id: row.get("gang_id")?,
        item_id: row.get("item_id")?,
        item_name: row.get("item_name")?,
        expires_at: opt_time(row, "expires_at")?,
        created_at: from_millis(row.get("created_at")?),
    })
}
