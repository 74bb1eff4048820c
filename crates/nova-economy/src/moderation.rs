use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info};

use nova_db::models::to_millis;
use nova_db::moderation::{self as records, NewModeration};
use nova_types::models::{ModerationAction, ModerationRecord};

use crate::{Economy, EconomyError, Result};

impl Economy {
    /// Appends a moderation record. The platform action itself is the
    /// caller's job; this only keeps the log.
    pub fn record_moderation(
        &self,
        user_id: &str,
        moderator_id: &str,
        action: ModerationAction,
        reason: &str,
        duration_secs: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<ModerationRecord> {
        if duration_secs.is_some_and(|secs| secs < 1) {
            return Err(EconomyError::InvalidAmount);
        }
        let expires_ms = duration_secs.map(|secs| to_millis(now + TimeDelta::seconds(secs)));

        let record = self.db.with_conn(|conn| {
            let id = records::insert(
                conn,
                &NewModeration {
                    user_id,
                    moderator_id,
                    action,
                    reason,
                    duration_secs,
                    expires_ms,
                    now_ms: to_millis(now),
                },
            )?;
            records::get(conn, id)
        })?;
        let record = record.ok_or(EconomyError::NotFound("moderation record"))?;

        info!(
            "{} recorded {} against {}: {}",
            moderator_id,
            action.as_str(),
            user_id,
            reason
        );
        Ok(record)
    }

    pub fn active_moderation(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<ModerationRecord>> {
        Ok(self
            .db
            .with_conn(|conn| records::active_for(conn, user_id, to_millis(now)))?)
    }

    pub fn expire_moderation(&self, record_id: i64) -> Result<()> {
        if !self.db.with_conn(|conn| records::deactivate(conn, record_id))? {
            return Err(EconomyError::NotFound("moderation record"));
        }
        debug!("Moderation record {} expired manually", record_id);
        Ok(())
    }

    /// Deactivates every record whose duration has run out. Returns how many.
    pub fn sweep_expired_moderation(&self, now: DateTime<Utc>) -> Result<usize> {
        Ok(self
            .db
            .with_conn(|conn| records::deactivate_expired(conn, to_millis(now)))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{at, economy};

    #[test]
    fn timed_records_lapse() {
        let eco = economy();
        let jail = eco
            .record_moderation("u1", "mod", ModerationAction::Jail, "spam", Some(600), at(0))
            .unwrap();
        let warn = eco
            .record_moderation("u1", "mod", ModerationAction::Warn, "rude", None, at(0))
            .unwrap();
        assert_eq!(jail.expires_at, Some(at(600)));
        assert!(warn.expires_at.is_none());
        assert_eq!(eco.active_moderation("u1", at(1)).unwrap().len(), 2);

        assert_eq!(eco.sweep_expired_moderation(at(600)).unwrap(), 1);
        let active = eco.active_moderation("u1", at(601)).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].action, ModerationAction::Warn);
    }

    #[test]
    fn manual_expiry() {
        let eco = economy();
        let ban = eco
            .record_moderation("u1", "mod", ModerationAction::Ban, "raid", None, at(0))
            .unwrap();
        eco.expire_moderation(ban.id).unwrap();
        assert!(eco.active_moderation("u1", at(1)).unwrap().is_empty());
        assert!(matches!(eco.expire_moderation(9_999), Err(EconomyError::NotFound(_))));
        assert!(matches!(
            eco.record_moderation("u1", "mod", ModerationAction::Mute, "x", Some(0), at(0)),
            Err(EconomyError::InvalidAmount)
        ));
    }
}
