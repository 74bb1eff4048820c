use anyhow::Result;
use rusqlite::{Connection, params};

use nova_types::models::{Account, LeaderboardMetric};

use crate::OptionalExt;
use crate::models::{ACCOUNT_COLUMNS, account_from_row};

/// The three time-gated activities, each with its own timestamp column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cooldown {
    Daily,
    Work,
    Rob,
}

impl Cooldown {
    fn column(self) -> &'static str {
        match self {
            Self::Daily => "daily_last",
            Self::Work => "work_last",
            Self::Rob => "rob_last",
        }
    }
}

/// Temporary status windows, active while `now < until`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusWindow {
    RobProtection,
    DoubleRob,
}

impl StatusWindow {
    fn column(self) -> &'static str {
        match self {
            Self::RobProtection => "rob_protection_until",
            Self::DoubleRob => "double_rob_until",
        }
    }
}

/// Experience and level after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExperienceRow {
    pub experience: i64,
    pub level: i64,
}

/// Create the account if absent. Returns whether a row was inserted.
pub fn ensure(conn: &Connection, id: &str, username: &str) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO users (id, username) VALUES (?1, ?2)",
        params![id, username],
    )?;
    Ok(inserted == 1)
}

pub fn get(conn: &Connection, id: &str) -> Result<Option<Account>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", ACCOUNT_COLUMNS);
    conn.query_row(&sql, [id], account_from_row).optional()
}

/// Unconditional `coins = coins + delta`. Returns the new balance, `None` if
/// the account does not exist.
pub fn add_coins(conn: &Connection, id: &str, delta: i64) -> Result<Option<i64>> {
    conn.query_row(
        "UPDATE users SET coins = coins + ?2 WHERE id = ?1 RETURNING coins",
        params![id, delta],
        |row| row.get(0),
    )
    .optional()
}

/// `coins = coins + delta`, applied only while `coins >= required`. The check
/// and the write are one statement, so two callers can never both pass the
/// check against the same stale balance. `None` means the guard failed (or
/// the account does not exist).
pub fn add_coins_guarded(
    conn: &Connection,
    id: &str,
    delta: i64,
    required: i64,
) -> Result<Option<i64>> {
    conn.query_row(
        "UPDATE users SET coins = coins + ?2 WHERE id = ?1 AND coins >= ?3 RETURNING coins",
        params![id, delta, required],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_coins(conn: &Connection, id: &str, coins: i64) -> Result<Option<i64>> {
    conn.query_row(
        "UPDATE users SET coins = ?2 WHERE id = ?1 RETURNING coins",
        params![id, coins],
        |row| row.get(0),
    )
    .optional()
}

/// Adds experience and recomputes the level in the same statement.
pub fn add_experience(conn: &Connection, id: &str, amount: i64) -> Result<Option<ExperienceRow>> {
    conn.query_row(
        "UPDATE users
         SET experience = experience + ?2,
             level = (experience + ?2) / 1000 + 1
         WHERE id = ?1
         RETURNING experience, level",
        params![id, amount],
        |row| {
            Ok(ExperienceRow {
                experience: row.get(0)?,
                level: row.get(1)?,
            })
        },
    )
    .optional()
}

pub fn set_experience(conn: &Connection, id: &str, experience: i64) -> Result<Option<ExperienceRow>> {
    conn.query_row(
        "UPDATE users
         SET experience = ?2,
             level = ?2 / 1000 + 1
         WHERE id = ?1
         RETURNING experience, level",
        params![id, experience],
        |row| {
            Ok(ExperienceRow {
                experience: row.get(0)?,
                level: row.get(1)?,
            })
        },
    )
    .optional()
}

/// Conditional cooldown claim: stamps the cooldown column with `now` and
/// credits `reward` only if the previous stamp is absent or at least
/// `window_ms` old. Returns the new balance, `None` if still cooling down.
pub fn claim_cooldown(
    conn: &Connection,
    id: &str,
    cooldown: Cooldown,
    now_ms: i64,
    window_ms: i64,
    reward: i64,
) -> Result<Option<i64>> {
    let col = cooldown.column();
    let sql = format!(
        "UPDATE users
         SET {col} = ?2, coins = coins + ?4
         WHERE id = ?1 AND ({col} IS NULL OR ?2 - {col} >= ?3)
         RETURNING coins"
    );
    conn.query_row(&sql, params![id, now_ms, window_ms, reward], |row| row.get(0))
        .optional()
}

/// Unconditional stamp, for callers already holding a transaction.
pub fn stamp_cooldown(conn: &Connection, id: &str, cooldown: Cooldown, now_ms: i64) -> Result<()> {
    let sql = format!("UPDATE users SET {} = ?2 WHERE id = ?1", cooldown.column());
    conn.execute(&sql, params![id, now_ms])?;
    Ok(())
}

pub fn set_status_until(
    conn: &Connection,
    id: &str,
    status: StatusWindow,
    until_ms: i64,
) -> Result<()> {
    let sql = format!("UPDATE users SET {} = ?2 WHERE id = ?1", status.column());
    conn.execute(&sql, params![id, until_ms])?;
    Ok(())
}

/// Returns the new message count.
pub fn record_message(conn: &Connection, id: &str) -> Result<Option<i64>> {
    conn.query_row(
        "UPDATE users SET message_count = message_count + 1 WHERE id = ?1 RETURNING message_count",
        [id],
        |row| row.get(0),
    )
    .optional()
}

/// Returns the new voice total in minutes.
pub fn add_voice_minutes(conn: &Connection, id: &str, minutes: i64) -> Result<Option<i64>> {
    conn.query_row(
        "UPDATE users SET voice_time = voice_time + ?2 WHERE id = ?1 RETURNING voice_time",
        params![id, minutes],
        |row| row.get(0),
    )
    .optional()
}

/// Updates cosmetics and charges `cost` in one statement, guarded by balance.
pub fn set_profile(
    conn: &Connection,
    id: &str,
    background: &str,
    nameplate: &str,
    cost: i64,
) -> Result<Option<i64>> {
    conn.query_row(
        "UPDATE users
         SET profile_background = ?2, profile_nameplate = ?3, coins = coins - ?4
         WHERE id = ?1 AND coins >= ?4
         RETURNING coins",
        params![id, background, nameplate, cost],
        |row| row.get(0),
    )
    .optional()
}

/// Top accounts by `metric`; ties fall back to insertion order.
pub fn leaderboard(conn: &Connection, metric: LeaderboardMetric, limit: u32) -> Result<Vec<Account>> {
    let sql = format!(
        "SELECT {} FROM users ORDER BY {} DESC, rowid ASC LIMIT ?1",
        ACCOUNT_COLUMNS,
        metric.column()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([limit], account_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    fn db_with(id: &str, coins: i64) -> Database {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            ensure(conn, id, id)?;
            set_coins(conn, id, coins)?;
            Ok(())
        })
        .unwrap();
        db
    }

    #[test]
    fn ensure_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let first = db.with_conn(|c| ensure(c, "u1", "alice")).unwrap();
        let second = db.with_conn(|c| ensure(c, "u1", "renamed")).unwrap();
        assert!(first);
        assert!(!second);

        let account = db.with_conn(|c| get(c, "u1")).unwrap().unwrap();
        assert_eq!(account.username, "alice");
        assert_eq!(account.coins, 0);
        assert_eq!(account.level, 1);
    }

    #[test]
    fn guarded_debit_refuses_overdraft() {
        let db = db_with("u1", 50);
        let denied = db.with_conn(|c| add_coins_guarded(c, "u1", -100, 100)).unwrap();
        assert_eq!(denied, None);

        let allowed = db.with_conn(|c| add_coins_guarded(c, "u1", -50, 50)).unwrap();
        assert_eq!(allowed, Some(0));
    }

    #[test]
    fn experience_recomputes_level() {
        let db = db_with("u1", 0);
        let row = db.with_conn(|c| add_experience(c, "u1", 2_345)).unwrap().unwrap();
        assert_eq!(row, ExperienceRow { experience: 2_345, level: 3 });
    }

    #[test]
    fn cooldown_claim_respects_window() {
        let db = db_with("u1", 0);
        let first = db
            .with_conn(|c| claim_cooldown(c, "u1", Cooldown::Daily, 1_000, 500, 100))
            .unwrap();
        assert_eq!(first, Some(100));

        let early = db
            .with_conn(|c| claim_cooldown(c, "u1", Cooldown::Daily, 1_499, 500, 100))
            .unwrap();
        assert_eq!(early, None);

        let later = db
            .with_conn(|c| claim_cooldown(c, "u1", Cooldown::Daily, 1_500, 500, 100))
            .unwrap();
        assert_eq!(later, Some(200));
    }

    #[test]
    fn leaderboard_orders_descending() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|c| {
            for (id, coins) in [("a", 10), ("b", 30), ("c", 20)] {
                ensure(c, id, id)?;
                set_coins(c, id, coins)?;
            }
            Ok(())
        })
        .unwrap();

        let top = db.with_conn(|c| leaderboard(c, LeaderboardMetric::Coins, 2)).unwrap();
        let ids: Vec<&str> = top.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }
}
