//! Passive activity: message and voice observation, and random currency drops.
//!
//! Voice session starts and pending drops live only in process memory. A
//! restart loses in-flight sessions and any unclaimed drop; neither is
//! replayed.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use nova_db::users;
use nova_types::events::BotEvent;

use crate::error::poisoned;
use crate::ledger::{LevelProgress, credit, grant_experience};
use crate::{Economy, EconomyError, Result};

#[derive(Debug, Clone)]
struct PendingDrop {
    channel_id: String,
    amount: i64,
    expires_at: DateTime<Utc>,
}

/// In-memory state owned by the tracker: one session start per connected
/// voice user, one entry per unclaimed drop.
#[derive(Debug, Default)]
pub struct ActivityTracker {
    voice_sessions: Mutex<HashMap<String, DateTime<Utc>>>,
    drops: Mutex<HashMap<Uuid, PendingDrop>>,
}

impl ActivityTracker {
    pub fn voice_session_start(&self, user_id: &str) -> Result<Option<DateTime<Utc>>> {
        let sessions = self
            .voice_sessions
            .lock()
            .map_err(|e| poisoned("voice sessions", e))?;
        Ok(sessions.get(user_id).copied())
    }

    pub fn pending_drops(&self) -> Result<usize> {
        let drops = self.drops.lock().map_err(|e| poisoned("drops", e))?;
        Ok(drops.len())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageOutcome {
    pub message_count: i64,
    pub progress: LevelProgress,
    /// Level-ups and spawned drops, for the platform layer to announce.
    pub events: Vec<BotEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoiceFlush {
    pub minutes: i64,
    pub voice_time: i64,
    pub progress: LevelProgress,
}

#[derive(Debug, Clone, Serialize)]
pub struct DropClaim {
    pub amount: i64,
    pub balance: i64,
    pub event: BotEvent,
}

impl Economy {
    pub fn activity(&self) -> &ActivityTracker {
        &self.activity
    }

    /// Counts a message, grants message experience and rolls for a drop.
    /// Messages from bots are ignored and yield `None`.
    pub fn observe_message(
        &self,
        user_id: &str,
        username: &str,
        channel_id: &str,
        is_bot: bool,
        now: DateTime<Utc>,
        rng: &mut impl Rng,
    ) -> Result<Option<MessageOutcome>> {
        if is_bot {
            return Ok(None);
        }
        let experience = self.config.message_experience;

        let (message_count, progress) = self.db.with_tx(|tx| {
            users::ensure(tx, user_id, username)?;
            let count = users::record_message(tx, user_id)?
                .ok_or(EconomyError::NotFound("account"))?;
            let progress = grant_experience(tx, user_id, experience)?;
            Ok::<_, EconomyError>((count, progress))
        })?;

        let mut events = Vec::new();
        if progress.leveled_up {
            info!("{} reached level {}", user_id, progress.level);
            events.push(BotEvent::LevelUp {
                user_id: user_id.to_string(),
                level: progress.level,
            });
        }
        if rng.random_bool(self.config.drop_chance) {
            let amount = rng.random_range(self.config.drop_amount.clone());
            events.push(self.spawn_drop(channel_id, amount, now)?);
        }

        Ok(Some(MessageOutcome {
            message_count,
            progress,
            events,
        }))
    }

    /// Places a claimable drop in `channel_id`, open for the configured window.
    pub fn spawn_drop(&self, channel_id: &str, amount: i64, now: DateTime<Utc>) -> Result<BotEvent> {
        let drop_id = Uuid::new_v4();
        let expires_at = now + self.config.drop_window;

        let mut drops = self.activity.drops.lock().map_err(|e| poisoned("drops", e))?;
        drops.insert(
            drop_id,
            PendingDrop {
                channel_id: channel_id.to_string(),
                amount,
                expires_at,
            },
        );
        info!("Drop {} of {} spawned in {}", drop_id, amount, channel_id);

        Ok(BotEvent::DropSpawned {
            drop_id,
            channel_id: channel_id.to_string(),
            amount,
            expires_at,
        })
    }

    /// First claimant inside the window takes the drop. Anyone after that,
    /// or after the window closes, gets `NotFound("drop")`. An expired drop
    /// stays pending until the sweep tears it down.
    pub fn claim_drop(
        &self,
        drop_id: Uuid,
        user_id: &str,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<DropClaim> {
        let pending = {
            let mut drops = self.activity.drops.lock().map_err(|e| poisoned("drops", e))?;
            let open = drops.get(&drop_id).is_some_and(|d| now < d.expires_at);
            if !open {
                return Err(EconomyError::NotFound("drop"));
            }
            drops.remove(&drop_id).ok_or(EconomyError::NotFound("drop"))?
        };

        let credited = self.db.with_tx(|tx| {
            users::ensure(tx, user_id, username)?;
            credit(tx, user_id, pending.amount)
        });
        let balance = match credited {
            Ok(balance) => balance,
            Err(e) => {
                // Put the drop back so a store hiccup does not destroy it.
                if let Ok(mut drops) = self.activity.drops.lock() {
                    drops.insert(drop_id, pending);
                }
                return Err(e);
            }
        };

        info!("{} claimed drop {} for {}", user_id, drop_id, pending.amount);
        Ok(DropClaim {
            amount: pending.amount,
            balance,
            event: BotEvent::DropClaimed {
                drop_id,
                channel_id: pending.channel_id,
                user_id: user_id.to_string(),
                amount: pending.amount,
            },
        })
    }

    /// Tears down every drop whose window has closed and returns their ids.
    /// Nothing is credited.
    pub fn sweep_expired_drops(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let mut drops = self.activity.drops.lock().map_err(|e| poisoned("drops", e))?;
        let expired: Vec<Uuid> = drops
            .iter()
            .filter(|(_, d)| now >= d.expires_at)
            .map(|(id, _)| *id)
            .collect();

        for id in &expired {
            if let Some(drop) = drops.remove(id) {
                debug!("Drop {} in {} expired unclaimed", id, drop.channel_id);
            }
        }
        Ok(expired)
    }

    /// Feeds one voice-state change. A join opens a session, a full
    /// disconnect closes it and flushes whole minutes plus voice experience.
    /// Moving between channels keeps the original session running.
    pub fn voice_state(
        &self,
        user_id: &str,
        username: &str,
        old_channel: Option<&str>,
        new_channel: Option<&str>,
        is_bot: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<VoiceFlush>> {
        if is_bot {
            return Ok(None);
        }

        let started = {
            let mut sessions = self
                .activity
                .voice_sessions
                .lock()
                .map_err(|e| poisoned("voice sessions", e))?;
            match (old_channel, new_channel) {
                (None, Some(_)) => {
                    sessions.entry(user_id.to_string()).or_insert(now);
                    return Ok(None);
                }
                (Some(_), None) => sessions.remove(user_id),
                _ => return Ok(None),
            }
        };
        // Left without a known start, e.g. joined before a restart.
        let Some(started) = started else {
            return Ok(None);
        };

        let minutes = (now - started).num_minutes().max(0);
        let experience =
            minutes / self.config.voice_block_minutes * self.config.voice_experience_per_block;

        let flush = self.db.with_tx(|tx| {
            users::ensure(tx, user_id, username)?;
            let voice_time = users::add_voice_minutes(tx, user_id, minutes)?
                .ok_or(EconomyError::NotFound("account"))?;
            let progress = grant_experience(tx, user_id, experience)?;
            Ok::<_, EconomyError>(VoiceFlush {
                minutes,
                voice_time,
                progress,
            })
        })?;

        debug!("{} spent {} minutes in voice", user_id, minutes);
        if flush.progress.leveled_up {
            info!("{} reached level {}", user_id, flush.progress.level);
        }
        Ok(Some(flush))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::EconomyConfig;
    use crate::testing::{at, economy};

    #[test]
    fn messages_count_and_grant_experience() {
        let eco = economy();
        let mut rng = StdRng::seed_from_u64(3);
        let outcome = eco
            .observe_message("u1", "alice", "general", false, at(0), &mut rng)
            .unwrap()
            .unwrap();
        assert_eq!(outcome.message_count, 1);
        assert_eq!(outcome.progress.experience, 5);

        let bot = eco
            .observe_message("bot", "helper", "general", true, at(0), &mut rng)
            .unwrap();
        assert!(bot.is_none());
        assert!(matches!(eco.account("bot"), Err(EconomyError::NotFound(_))));
    }

    #[test]
    fn message_level_up_is_announced() {
        let eco = economy();
        let mut rng = StdRng::seed_from_u64(3);
        eco.ensure_account("u1", "alice").unwrap();
        eco.add_experience("u1", 996).unwrap();

        let outcome = eco
            .observe_message("u1", "alice", "general", false, at(0), &mut rng)
            .unwrap()
            .unwrap();
        assert!(outcome.events.contains(&BotEvent::LevelUp {
            user_id: "u1".into(),
            level: 2,
        }));
    }

    #[test]
    fn certain_drop_chance_spawns_a_drop() {
        let db = nova_db::Database::open_in_memory().unwrap();
        let config = EconomyConfig {
            drop_chance: 1.0,
            ..EconomyConfig::default()
        };
        let eco = Economy::new(std::sync::Arc::new(db), config);
        let mut rng = StdRng::seed_from_u64(9);

        let outcome = eco
            .observe_message("u1", "alice", "general", false, at(0), &mut rng)
            .unwrap()
            .unwrap();
        let spawned = outcome.events.iter().find_map(|e| match e {
            BotEvent::DropSpawned { amount, .. } => Some(*amount),
            _ => None,
        });
        assert!(spawned.is_some_and(|amount| (10..=50).contains(&amount)));
        assert_eq!(eco.activity().pending_drops().unwrap(), 1);
    }

    #[test]
    fn only_the_first_claim_wins() {
        let eco = economy();
        let BotEvent::DropSpawned { drop_id, .. } = eco.spawn_drop("general", 25, at(0)).unwrap()
        else {
            panic!("expected a spawned drop");
        };

        let claim = eco.claim_drop(drop_id, "u1", "alice", at(5)).unwrap();
        assert_eq!((claim.amount, claim.balance), (25, 25));
        assert!(matches!(
            eco.claim_drop(drop_id, "u2", "bob", at(6)),
            Err(EconomyError::NotFound("drop"))
        ));
    }

    #[test]
    fn expired_drops_are_swept_without_credit() {
        let eco = economy();
        let BotEvent::DropSpawned { drop_id, .. } = eco.spawn_drop("general", 25, at(0)).unwrap()
        else {
            panic!("expected a spawned drop");
        };

        assert!(eco.sweep_expired_drops(at(29)).unwrap().is_empty());
        assert!(matches!(
            eco.claim_drop(drop_id, "u1", "alice", at(30)),
            Err(EconomyError::NotFound("drop"))
        ));
        // The late claim leaves the drop for the sweep to report.
        assert_eq!(eco.activity().pending_drops().unwrap(), 1);

        let BotEvent::DropSpawned { drop_id: second, .. } = eco.spawn_drop("general", 10, at(100)).unwrap()
        else {
            panic!("expected a spawned drop");
        };
        let mut swept = eco.sweep_expired_drops(at(200)).unwrap();
        swept.sort();
        let mut expected = vec![drop_id, second];
        expected.sort();
        assert_eq!(swept, expected);
        assert_eq!(eco.activity().pending_drops().unwrap(), 0);
        assert!(matches!(eco.account("u1"), Err(EconomyError::NotFound(_))));
    }

    #[test]
    fn channel_switch_keeps_the_session() {
        let eco = economy();
        let start = at(0);

        assert!(eco.voice_state("u1", "alice", None, Some("a"), false, start).unwrap().is_none());
        let switched = eco
            .voice_state("u1", "alice", Some("a"), Some("b"), false, start + TimeDelta::minutes(7))
            .unwrap();
        assert!(switched.is_none());
        assert_eq!(eco.activity().voice_session_start("u1").unwrap(), Some(start));

        let flush = eco
            .voice_state("u1", "alice", Some("b"), None, false, start + TimeDelta::minutes(12))
            .unwrap()
            .unwrap();
        assert_eq!(flush.minutes, 12);
        assert_eq!(flush.voice_time, 12);
        assert_eq!(flush.progress.experience, 20);
        assert_eq!(eco.activity().voice_session_start("u1").unwrap(), None);
    }

    #[test]
    fn leave_without_a_session_is_ignored() {
        let eco = economy();
        let flush = eco.voice_state("u1", "alice", Some("a"), None, false, at(0)).unwrap();
        assert!(flush.is_none());

        let bot = eco.voice_state("bot", "helper", None, Some("a"), true, at(0)).unwrap();
        assert!(bot.is_none());
        assert_eq!(eco.activity().voice_session_start("bot").unwrap(), None);
    }
}
