use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id                    TEXT PRIMARY KEY,
                username              TEXT NOT NULL,
                coins                 INTEGER NOT NULL DEFAULT 0,
                experience            INTEGER NOT NULL DEFAULT 0 CHECK (experience >= 0),
                level                 INTEGER NOT NULL DEFAULT 1,
                daily_last            INTEGER,
                work_last             INTEGER,
                rob_last              INTEGER,
                rob_protection_until  INTEGER,
                double_rob_until      INTEGER,
                message_count         INTEGER NOT NULL DEFAULT 0 CHECK (message_count >= 0),
                voice_time            INTEGER NOT NULL DEFAULT 0 CHECK (voice_time >= 0),
                profile_background    TEXT NOT NULL DEFAULT 'default',
                profile_nameplate     TEXT NOT NULL DEFAULT 'default',
                created_at            TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE gangs (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL UNIQUE,
                leader_id   TEXT NOT NULL REFERENCES users(id),
                vault       INTEGER NOT NULL DEFAULT 0 CHECK (vault >= 0),
                level       INTEGER NOT NULL DEFAULT 1,
                experience  INTEGER NOT NULL DEFAULT 0,
                created_at  INTEGER NOT NULL
            );

            -- user_id as the key: one gang per user
            CREATE TABLE gang_members (
                user_id    TEXT PRIMARY KEY REFERENCES users(id),
                gang_id    INTEGER NOT NULL REFERENCES gangs(id) ON DELETE CASCADE,
                role       TEXT NOT NULL CHECK (role IN ('leader', 'agent', 'member')),
                joined_at  INTEGER NOT NULL
            );

            CREATE UNIQUE INDEX idx_gang_members_one_leader
                ON gang_members(gang_id) WHERE role = 'leader';

            CREATE INDEX idx_gang_members_gang
                ON gang_members(gang_id, joined_at);

            CREATE TABLE moderation (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id        TEXT NOT NULL,
                moderator_id   TEXT NOT NULL,
                action         TEXT NOT NULL CHECK (action IN ('jail', 'ban', 'kick', 'warn', 'mute')),
                reason         TEXT NOT NULL,
                duration_secs  INTEGER,
                expires_at     INTEGER,
                active         INTEGER NOT NULL DEFAULT 1,
                created_at     INTEGER NOT NULL
            );

            CREATE INDEX idx_moderation_user
                ON moderation(user_id, active);

            CREATE TABLE shop_items (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                name           TEXT NOT NULL,
                description    TEXT NOT NULL,
                price          INTEGER NOT NULL CHECK (price > 0),
                kind           TEXT NOT NULL CHECK (kind IN ('perk', 'gang_perk')),
                effect         TEXT NOT NULL CHECK (effect IN ('rob_protection', 'double_rob', 'role')),
                duration_secs  INTEGER,
                role_id        TEXT,
                active         INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE purchases (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     TEXT NOT NULL REFERENCES users(id),
                gang_id     INTEGER REFERENCES gangs(id) ON DELETE SET NULL,
                item_id     INTEGER NOT NULL REFERENCES shop_items(id),
                expires_at  INTEGER,
                created_at  INTEGER NOT NULL
            );

            CREATE INDEX idx_purchases_user
                ON purchases(user_id, item_id);

            CREATE TABLE reactions (
                actor_id   TEXT NOT NULL,
                target_id  TEXT NOT NULL,
                kind       TEXT NOT NULL,
                count      INTEGER NOT NULL DEFAULT 1,
                PRIMARY KEY (actor_id, target_id, kind)
            );

            CREATE INDEX idx_reactions_target
                ON reactions(target_id, kind);

            -- Default catalogue
            INSERT INTO shop_items (name, description, price, kind, effect, duration_secs) VALUES
                ('Rob Protection', 'Protects you from robberies for 24 hours', 500, 'perk', 'rob_protection', 86400),
                ('Double Rob', 'Successful robs steal double for the next hour', 750, 'perk', 'double_rob', 3600),
                ('VIP Status', 'Get the VIP role and special privileges', 2000, 'perk', 'role', NULL),
                ('Gang Vault Boost', 'Increases gang vault capacity by 50%', 2500, 'gang_perk', 'role', NULL),
                ('Fast Recruitment', 'Allows recruiting more members faster', 1500, 'gang_perk', 'role', NULL),
                ('Gang XP Boost', 'All gang members gain 25% more XP', 3000, 'gang_perk', 'role', NULL),
                ('Elite Status', 'Unlocks elite gang features and role', 5000, 'gang_perk', 'role', NULL),
                ('Gang Protection', 'Protects all gang members from raids for 24h', 4000, 'gang_perk', 'role', 86400);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let items: i64 = conn
            .query_row("SELECT COUNT(*) FROM shop_items", [], |r| r.get(0))
            .unwrap();
        assert_eq!(items, 8);
    }
}
