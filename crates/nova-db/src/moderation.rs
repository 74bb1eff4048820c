use anyhow::Result;
use rusqlite::{Connection, params};

use nova_types::models::{ModerationAction, ModerationRecord};

use crate::OptionalExt;
use crate::models::{MODERATION_COLUMNS, moderation_from_row};

pub struct NewModeration<'a> {
    pub user_id: &'a str,
    pub moderator_id: &'a str,
    pub action: ModerationAction,
    pub reason: &'a str,
    pub duration_secs: Option<i64>,
    pub expires_ms: Option<i64>,
    pub now_ms: i64,
}

pub fn insert(conn: &Connection, record: &NewModeration<'_>) -> Result<i64> {
    conn.execute(
        "INSERT INTO moderation (user_id, moderator_id, action, reason, duration_secs, expires_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.user_id,
            record.moderator_id,
            record.action.as_str(),
            record.reason,
            record.duration_secs,
            record.expires_ms,
            record.now_ms
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get(conn: &Connection, id: i64) -> Result<Option<ModerationRecord>> {
    let sql = format!("SELECT {} FROM moderation WHERE id = ?1", MODERATION_COLUMNS);
    conn.query_row(&sql, [id], moderation_from_row).optional()
}

/// Active records that have not yet expired.
pub fn active_for(conn: &Connection, user_id: &str, now_ms: i64) -> Result<Vec<ModerationRecord>> {
    let sql = format!(
        "SELECT {} FROM moderation
         WHERE user_id = ?1 AND active = 1 AND (expires_at IS NULL OR expires_at > ?2)
         ORDER BY created_at, id",
        MODERATION_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![user_id, now_ms], moderation_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn deactivate(conn: &Connection, id: i64) -> Result<bool> {
    let updated = conn.execute("UPDATE moderation SET active = 0 WHERE id = ?1", [id])?;
    Ok(updated == 1)
}

/// Deactivates every active record whose `expires_at` has passed.
pub fn deactivate_expired(conn: &Connection, now_ms: i64) -> Result<usize> {
    let updated = conn.execute(
        "UPDATE moderation SET active = 0
         WHERE active = 1 AND expires_at IS NOT NULL AND expires_at <= ?1",
        [now_ms],
    )?;
    Ok(updated)
}
