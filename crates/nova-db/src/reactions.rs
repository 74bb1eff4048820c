use anyhow::Result;
use rusqlite::{Connection, params};

use nova_types::models::ReactionKind;

/// Bumps the (actor, target, kind) counter. Returns the new count.
pub fn increment(conn: &Connection, actor_id: &str, target_id: &str, kind: ReactionKind) -> Result<i64> {
    Ok(conn.query_row(
        "INSERT INTO reactions (actor_id, target_id, kind, count) VALUES (?1, ?2, ?3, 1)
         ON CONFLICT(actor_id, target_id, kind) DO UPDATE SET count = count + 1
         RETURNING count",
        params![actor_id, target_id, kind.as_str()],
        |row| row.get(0),
    )?)
}

/// Total `kind` reactions received by `target_id` from everyone.
pub fn received_total(conn: &Connection, target_id: &str, kind: ReactionKind) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COALESCE(SUM(count), 0) FROM reactions WHERE target_id = ?1 AND kind = ?2",
        params![target_id, kind.as_str()],
        |row| row.get(0),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[test]
    fn counters_accumulate_per_actor() {
        let db = Database::open_in_memory().unwrap();
        let counts = db
            .with_conn(|c| {
                let a = increment(c, "a", "t", ReactionKind::Hug)?;
                let b = increment(c, "a", "t", ReactionKind::Hug)?;
                increment(c, "b", "t", ReactionKind::Hug)?;
                increment(c, "b", "t", ReactionKind::Slap)?;
                Ok((a, b, received_total(c, "t", ReactionKind::Hug)?))
            })
            .unwrap();
        assert_eq!(counts, (1, 2, 3));
    }
}
