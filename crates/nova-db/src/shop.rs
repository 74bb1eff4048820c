use anyhow::Result;
use rusqlite::{Connection, params};

use nova_types::models::{ItemKind, Purchase, ShopItem};

use crate::OptionalExt;
use crate::models::{SHOP_ITEM_COLUMNS, purchase_from_row, shop_item_from_row};

/// Who a purchase belongs to for the "already owned" check.
#[derive(Debug, Clone, Copy)]
pub enum Owner<'a> {
    User(&'a str),
    Gang(i64),
}

pub fn items(conn: &Connection, kind: Option<ItemKind>) -> Result<Vec<ShopItem>> {
    let sql = format!(
        "SELECT {} FROM shop_items WHERE active = 1 AND (?1 IS NULL OR kind = ?1) ORDER BY id",
        SHOP_ITEM_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([kind.map(ItemKind::as_str)], shop_item_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Active catalogue entry by id.
pub fn item(conn: &Connection, id: i64) -> Result<Option<ShopItem>> {
    let sql = format!(
        "SELECT {} FROM shop_items WHERE id = ?1 AND active = 1",
        SHOP_ITEM_COLUMNS
    );
    conn.query_row(&sql, [id], shop_item_from_row).optional()
}

/// Whether `owner` holds an unexpired purchase of `item_id`. Gang ownership is
/// only counted through purchases tagged with the gang; personal ownership
/// only through untagged ones.
pub fn owns(conn: &Connection, owner: Owner<'_>, item_id: i64, now_ms: i64) -> Result<bool> {
    let found: Option<i64> = match owner {
        Owner::User(user_id) => conn
            .query_row(
                "SELECT 1 FROM purchases
                 WHERE user_id = ?1 AND gang_id IS NULL AND item_id = ?2
                   AND (expires_at IS NULL OR expires_at > ?3)
                 LIMIT 1",
                params![user_id, item_id, now_ms],
                |row| row.get(0),
            )
            .optional()?,
        Owner::Gang(gang_id) => conn
            .query_row(
                "SELECT 1 FROM purchases
                 WHERE gang_id = ?1 AND item_id = ?2
                   AND (expires_at IS NULL OR expires_at > ?3)
                 LIMIT 1",
                params![gang_id, item_id, now_ms],
                |row| row.get(0),
            )
            .optional()?,
    };
    Ok(found.is_some())
}

pub fn insert_purchase(
    conn: &Connection,
    user_id: &str,
    gang_id: Option<i64>,
    item_id: i64,
    expires_ms: Option<i64>,
    now_ms: i64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO purchases (user_id, gang_id, item_id, expires_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id, gang_id, item_id, expires_ms, now_ms],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn purchase(conn: &Connection, id: i64) -> Result<Option<Purchase>> {
    conn.query_row(
        "SELECT p.id, p.user_id, p.gang_id, p.item_id, si.name AS item_name, p.expires_at, p.created_at
         FROM purchases p
         JOIN shop_items si ON si.id = p.item_id
         WHERE p.id = ?1",
        [id],
        purchase_from_row,
    )
    .optional()
}

/// Unexpired purchases made by a user, newest first.
pub fn purchases_for(conn: &Connection, user_id: &str, now_ms: i64) -> Result<Vec<Purchase>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.user_id, p.gang_id, p.item_id, si.name AS item_name, p.expires_at, p.created_at
         FROM purchases p
         JOIN shop_items si ON si.id = p.item_id
         WHERE p.user_id = ?1 AND (p.expires_at IS NULL OR p.expires_at > ?2)
         ORDER BY p.created_at DESC, p.id DESC",
    )?;
    let rows = stmt
        .query_map(params![user_id, now_ms], purchase_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, users};

    #[test]
    fn catalogue_filters_by_kind() {
        let db = Database::open_in_memory().unwrap();
        let perks = db.with_conn(|c| items(c, Some(ItemKind::Perk))).unwrap();
        let all = db.with_conn(|c| items(c, None)).unwrap();
        assert_eq!(perks.len(), 3);
        assert_eq!(all.len(), 8);
        assert!(perks.iter().all(|i| i.kind == ItemKind::Perk));
    }

    #[test]
    fn expired_purchases_are_not_owned() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|c| {
            users::ensure(c, "u1", "alice")?;
            insert_purchase(c, "u1", None, 1, Some(1_000), 0)?;
            Ok(())
        })
        .unwrap();

        assert!(db.with_conn(|c| owns(c, Owner::User("u1"), 1, 999)).unwrap());
        assert!(!db.with_conn(|c| owns(c, Owner::User("u1"), 1, 1_000)).unwrap());
        assert!(db.with_conn(|c| purchases_for(c, "u1", 1_000)).unwrap().is_empty());
    }
}
