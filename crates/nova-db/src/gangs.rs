use anyhow::Result;
use rusqlite::{Connection, params};

use nova_types::models::{Gang, GangMember, GangRole};

use crate::OptionalExt;
use crate::models::{GANG_COLUMNS, gang_from_row, member_from_row};

const MEMBER_SELECT: &str = "SELECT gm.user_id, u.username, gm.gang_id, gm.role, gm.joined_at
     FROM gang_members gm
     JOIN users u ON u.id = gm.user_id";

/// Inserts the gang row only; the caller inserts the leader membership in the
/// same transaction.
pub fn insert(conn: &Connection, name: &str, leader_id: &str, now_ms: i64) -> Result<i64> {
    conn.execute(
        "INSERT INTO gangs (name, leader_id, created_at) VALUES (?1, ?2, ?3)",
        params![name, leader_id, now_ms],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get(conn: &Connection, id: i64) -> Result<Option<Gang>> {
    let sql = format!("SELECT {} FROM gangs WHERE id = ?1", GANG_COLUMNS);
    conn.query_row(&sql, [id], gang_from_row).optional()
}

pub fn get_by_name(conn: &Connection, name: &str) -> Result<Option<Gang>> {
    let sql = format!("SELECT {} FROM gangs WHERE name = ?1", GANG_COLUMNS);
    conn.query_row(&sql, [name], gang_from_row).optional()
}

/// The membership row for a user, if they belong to any gang.
pub fn membership(conn: &Connection, user_id: &str) -> Result<Option<GangMember>> {
    let sql = format!("{} WHERE gm.user_id = ?1", MEMBER_SELECT);
    conn.query_row(&sql, [user_id], member_from_row).optional()
}

pub fn insert_member(
    conn: &Connection,
    user_id: &str,
    gang_id: i64,
    role: GangRole,
    now_ms: i64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO gang_members (user_id, gang_id, role, joined_at) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, gang_id, role.as_str(), now_ms],
    )?;
    Ok(())
}

pub fn delete_member(conn: &Connection, user_id: &str) -> Result<bool> {
    let removed = conn.execute("DELETE FROM gang_members WHERE user_id = ?1", [user_id])?;
    Ok(removed == 1)
}

/// In-place role change; the row never disappears.
pub fn set_role(conn: &Connection, user_id: &str, gang_id: i64, role: GangRole) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE gang_members SET role = ?3 WHERE user_id = ?1 AND gang_id = ?2",
        params![user_id, gang_id, role.as_str()],
    )?;
    Ok(updated == 1)
}

pub fn set_leader(conn: &Connection, gang_id: i64, leader_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE gangs SET leader_id = ?2 WHERE id = ?1",
        params![gang_id, leader_id],
    )?;
    Ok(())
}

/// Members in join order.
pub fn members(conn: &Connection, gang_id: i64) -> Result<Vec<GangMember>> {
    let sql = format!(
        "{} WHERE gm.gang_id = ?1 ORDER BY gm.joined_at, gm.rowid",
        MEMBER_SELECT
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([gang_id], member_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_role(conn: &Connection, gang_id: i64, role: GangRole) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM gang_members WHERE gang_id = ?1 AND role = ?2",
        params![gang_id, role.as_str()],
        |row| row.get(0),
    )?)
}

/// `vault = vault + delta` unless that would drop below zero. Returns the new
/// vault, `None` if refused or the gang does not exist.
pub fn add_to_vault(conn: &Connection, gang_id: i64, delta: i64) -> Result<Option<i64>> {
    conn.query_row(
        "UPDATE gangs SET vault = vault + ?2 WHERE id = ?1 AND vault + ?2 >= 0 RETURNING vault",
        params![gang_id, delta],
        |row| row.get(0),
    )
    .optional()
}

/// Removes every membership and then the gang itself.
pub fn delete(conn: &Connection, gang_id: i64) -> Result<()> {
    conn.execute("DELETE FROM gang_members WHERE gang_id = ?1", [gang_id])?;
    conn.execute("DELETE FROM gangs WHERE id = ?1", [gang_id])?;
    Ok(())
}

/// Ordered by level, then experience.
pub fn leaderboard(conn: &Connection, limit: u32) -> Result<Vec<Gang>> {
    let sql = format!(
        "SELECT {} FROM gangs ORDER BY level DESC, experience DESC, id ASC LIMIT ?1",
        GANG_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([limit], gang_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, users};

    fn seeded() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let gang_id = db
            .with_conn(|c| {
                for id in ["boss", "grunt"] {
                    users::ensure(c, id, id)?;
                }
                let gang_id = insert(c, "Foo", "boss", 1)?;
                insert_member(c, "boss", gang_id, GangRole::Leader, 1)?;
                insert_member(c, "grunt", gang_id, GangRole::Member, 2)?;
                Ok(gang_id)
            })
            .unwrap();
        (db, gang_id)
    }

    #[test]
    fn schema_rejects_second_membership() {
        let (db, _) = seeded();
        let other = db
            .with_conn(|c| {
                users::ensure(c, "rival", "rival")?;
                insert(c, "Bar", "rival", 3)
            })
            .unwrap();
        let dup = db.with_conn(|c| insert_member(c, "grunt", other, GangRole::Member, 4));
        assert!(dup.is_err());
    }

    #[test]
    fn schema_rejects_second_leader() {
        let (db, gang_id) = seeded();
        let result = db.with_conn(|c| set_role(c, "grunt", gang_id, GangRole::Leader));
        assert!(result.is_err());
        let leaders = db.with_conn(|c| count_role(c, gang_id, GangRole::Leader)).unwrap();
        assert_eq!(leaders, 1);
    }

    #[test]
    fn vault_never_goes_negative() {
        let (db, gang_id) = seeded();
        assert_eq!(db.with_conn(|c| add_to_vault(c, gang_id, 30)).unwrap(), Some(30));
        assert_eq!(db.with_conn(|c| add_to_vault(c, gang_id, -31)).unwrap(), None);
        assert_eq!(db.with_conn(|c| add_to_vault(c, gang_id, -30)).unwrap(), Some(0));
    }

    #[test]
    fn members_listed_in_join_order() {
        let (db, gang_id) = seeded();
        let listed = db.with_conn(|c| members(c, gang_id)).unwrap();
        let ids: Vec<&str> = listed.iter().map(|m| m.user_id.as_str()).collect();
        assert_eq!(ids, vec!["boss", "grunt"]);
        assert_eq!(listed[0].role, GangRole::Leader);
    }
}
