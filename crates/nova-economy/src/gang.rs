use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use nova_db::models::to_millis;
use nova_db::{Connection, gangs};
use nova_types::models::{Gang, GangMember, GangRole};

use crate::ledger::{credit, debit, require_account};
use crate::{Economy, EconomyError, Result};

const MAX_LEADERBOARD: u32 = 100;

#[derive(Debug, Clone, Serialize)]
pub struct GangInfo {
    pub gang: Gang,
    pub members: Vec<GangMember>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VaultReceipt {
    pub amount: i64,
    pub vault: i64,
    pub balance: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Disbanded {
    pub gang_id: i64,
    pub name: String,
    pub refunded: i64,
    pub balance: i64,
}

fn require_membership(conn: &Connection, user_id: &str) -> Result<GangMember> {
    gangs::membership(conn, user_id)?.ok_or(EconomyError::NotInGang)
}

fn require_gang(conn: &Connection, gang_id: i64) -> Result<Gang> {
    gangs::get(conn, gang_id)?.ok_or(EconomyError::NotFound("gang"))
}

/// The actor's membership, provided they lead their gang.
fn require_leader(conn: &Connection, actor_id: &str) -> Result<GangMember> {
    let actor = require_membership(conn, actor_id)?;
    if actor.role != GangRole::Leader {
        return Err(EconomyError::Forbidden);
    }
    Ok(actor)
}

/// The target's membership, provided it is in `gang_id` and is not the actor.
fn require_fellow(conn: &Connection, actor_id: &str, target_id: &str, gang_id: i64) -> Result<GangMember> {
    if actor_id == target_id {
        return Err(EconomyError::InvalidTarget);
    }
    match gangs::membership(conn, target_id)? {
        Some(target) if target.gang_id == gang_id => Ok(target),
        _ => Err(EconomyError::NotInSameGang),
    }
}

impl Economy {
    /// Charges the founder the creation cost and installs them as leader of
    /// a new gang, in one transaction.
    pub fn create_gang(&self, founder_id: &str, name: &str, now: DateTime<Utc>) -> Result<Gang> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > self.config.gang_name_max_len {
            return Err(EconomyError::InvalidName);
        }
        let cost = self.config.gang_creation_cost;

        let gang = self.db.with_tx(|tx| {
            require_account(tx, founder_id)?;
            if gangs::get_by_name(tx, name)?.is_some() {
                return Err(EconomyError::DuplicateName);
            }
            if gangs::membership(tx, founder_id)?.is_some() {
                return Err(EconomyError::AlreadyInGang);
            }
            debit(tx, founder_id, cost)?;

            let now_ms = to_millis(now);
            let gang_id = gangs::insert(tx, name, founder_id, now_ms)?;
            gangs::insert_member(tx, founder_id, gang_id, GangRole::Leader, now_ms)?;
            require_gang(tx, gang_id)
        })?;

        info!("Gang '{}' ({}) created by {}", gang.name, gang.id, founder_id);
        Ok(gang)
    }

    pub fn join_gang(&self, user_id: &str, gang_name: &str, now: DateTime<Utc>) -> Result<GangMember> {
        let member = self.db.with_tx(|tx| {
            require_account(tx, user_id)?;
            if gangs::membership(tx, user_id)?.is_some() {
                return Err(EconomyError::AlreadyInGang);
            }
            let gang = gangs::get_by_name(tx, gang_name.trim())?
                .ok_or(EconomyError::NotFound("gang"))?;
            gangs::insert_member(tx, user_id, gang.id, GangRole::Member, to_millis(now))?;
            require_membership(tx, user_id)
        })?;

        debug!("{} joined gang {}", user_id, member.gang_id);
        Ok(member)
    }

    pub fn leave_gang(&self, user_id: &str) -> Result<Gang> {
        let gang = self.db.with_tx(|tx| {
            let member = require_membership(tx, user_id)?;
            if member.role == GangRole::Leader {
                return Err(EconomyError::LeaderCannotLeave);
            }
            let gang = require_gang(tx, member.gang_id)?;
            gangs::delete_member(tx, user_id)?;
            Ok(gang)
        })?;

        debug!("{} left gang {}", user_id, gang.id);
        Ok(gang)
    }

    /// Changes a member's role in place. Only `agent` and `member` can be
    /// assigned here; leadership moves through `transfer_leadership`.
    pub fn promote(&self, actor_id: &str, target_id: &str, role: GangRole) -> Result<GangMember> {
        if role == GangRole::Leader {
            return Err(EconomyError::InvalidRole);
        }

        let member = self.db.with_tx(|tx| {
            let actor = require_leader(tx, actor_id)?;
            let target = require_fellow(tx, actor_id, target_id, actor.gang_id)?;
            gangs::set_role(tx, &target.user_id, target.gang_id, role)?;
            require_membership(tx, target_id)
        })?;

        debug!("{} set {} to {}", actor_id, target_id, role.as_str());
        Ok(member)
    }

    pub fn kick(&self, actor_id: &str, target_id: &str) -> Result<()> {
        self.db.with_tx(|tx| {
            let actor = require_membership(tx, actor_id)?;
            if !actor.role.is_officer() {
                return Err(EconomyError::Forbidden);
            }
            let target = require_fellow(tx, actor_id, target_id, actor.gang_id)?;
            if target.role == GangRole::Leader {
                return Err(EconomyError::CannotKickLeader);
            }
            gangs::delete_member(tx, target_id)?;
            Ok(())
        })?;

        info!("{} kicked {} from their gang", actor_id, target_id);
        Ok(())
    }

    pub fn deposit(&self, user_id: &str, amount: i64) -> Result<VaultReceipt> {
        if amount < 1 {
            return Err(EconomyError::InvalidAmount);
        }

        self.db.with_tx(|tx| {
            let member = require_membership(tx, user_id)?;
            let balance = debit(tx, user_id, amount)?;
            let vault = gangs::add_to_vault(tx, member.gang_id, amount)?
                .ok_or(EconomyError::NotFound("gang"))?;
            Ok(VaultReceipt { amount, vault, balance })
        })
    }

    pub fn withdraw(&self, user_id: &str, amount: i64) -> Result<VaultReceipt> {
        if amount < 1 {
            return Err(EconomyError::InvalidAmount);
        }

        self.db.with_tx(|tx| {
            let member = require_membership(tx, user_id)?;
            if !member.role.is_officer() {
                return Err(EconomyError::Forbidden);
            }
            let vault = gangs::add_to_vault(tx, member.gang_id, -amount)?
                .ok_or(EconomyError::InsufficientFunds)?;
            let balance = credit(tx, user_id, amount)?;
            Ok(VaultReceipt { amount, vault, balance })
        })
    }

    /// Hands leadership to another member. The old leader stays on as an agent.
    pub fn transfer_leadership(&self, actor_id: &str, target_id: &str) -> Result<Gang> {
        let gang = self.db.with_tx(|tx| {
            let actor = require_leader(tx, actor_id)?;
            let target = require_fellow(tx, actor_id, target_id, actor.gang_id)?;

            // Demote first: at most one leader row may exist at any time.
            gangs::set_role(tx, actor_id, actor.gang_id, GangRole::Agent)?;
            gangs::set_role(tx, &target.user_id, actor.gang_id, GangRole::Leader)?;
            gangs::set_leader(tx, actor.gang_id, target_id)?;
            require_gang(tx, actor.gang_id)
        })?;

        info!("Leadership of '{}' passed from {} to {}", gang.name, actor_id, target_id);
        Ok(gang)
    }

    /// Refunds the vault to the leader, then removes the gang and every membership.
    pub fn disband(&self, actor_id: &str) -> Result<Disbanded> {
        let disbanded = self.db.with_tx(|tx| {
            let actor = require_leader(tx, actor_id)?;
            let gang = require_gang(tx, actor.gang_id)?;

            let balance = if gang.vault > 0 {
                gangs::add_to_vault(tx, gang.id, -gang.vault)?;
                credit(tx, actor_id, gang.vault)?
            } else {
                require_account(tx, actor_id)?.coins
            };
            gangs::delete(tx, gang.id)?;

            Ok::<_, EconomyError>(Disbanded {
                gang_id: gang.id,
                name: gang.name,
                refunded: gang.vault,
                balance,
            })
        })?;

        info!("Gang '{}' disbanded by {}", disbanded.name, actor_id);
        Ok(disbanded)
    }

    pub fn gang_of(&self, user_id: &str) -> Result<Option<Gang>> {
        Ok(self.db.with_conn(|conn| match gangs::membership(conn, user_id)? {
            Some(member) => gangs::get(conn, member.gang_id),
            None => Ok(None),
        })?)
    }

    pub fn gang_info(&self, gang_name: &str) -> Result<GangInfo> {
        let info = self.db.with_conn(|conn| {
            let Some(gang) = gangs::get_by_name(conn, gang_name.trim())? else {
                return Ok(None);
            };
            let members = gangs::members(conn, gang.id)?;
            Ok(Some(GangInfo { gang, members }))
        })?;
        info.ok_or(EconomyError::NotFound("gang"))
    }

    pub fn gang_leaderboard(&self, limit: u32) -> Result<Vec<Gang>> {
        let limit = limit.min(MAX_LEADERBOARD);
        Ok(self.db.with_conn(|conn| gangs::leaderboard(conn, limit))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{at, economy_with};

    fn leaders(eco: &Economy, gang_id: i64) -> i64 {
        eco.db()
            .with_conn(|c| gangs::count_role(c, gang_id, GangRole::Leader))
            .unwrap()
    }

    /// "Foo" led by `boss` with `grunt` and `agent` as members.
    fn crew() -> (Economy, Gang) {
        let eco = economy_with(&[("boss", 1000), ("grunt", 100), ("agent", 100), ("loner", 2000)]);
        let gang = eco.create_gang("boss", "Foo", at(0)).unwrap();
        eco.join_gang("grunt", "Foo", at(1)).unwrap();
        eco.join_gang("agent", "Foo", at(2)).unwrap();
        eco.promote("boss", "agent", GangRole::Agent).unwrap();
        (eco, gang)
    }

    #[test]
    fn creating_a_gang_charges_the_founder() {
        let eco = economy_with(&[("boss", 1000), ("rival", 5000)]);
        let gang = eco.create_gang("boss", "Foo", at(0)).unwrap();
        assert_eq!(gang.leader_id, "boss");
        assert_eq!(eco.account("boss").unwrap().coins, 0);
        assert_eq!(leaders(&eco, gang.id), 1);

        assert!(matches!(
            eco.create_gang("rival", "Foo", at(1)),
            Err(EconomyError::DuplicateName)
        ));
        assert_eq!(eco.account("rival").unwrap().coins, 5000);
    }

    #[test]
    fn creation_failures_leave_no_trace() {
        let eco = economy_with(&[("poor", 999)]);
        assert!(matches!(
            eco.create_gang("poor", "Foo", at(0)),
            Err(EconomyError::InsufficientFunds)
        ));
        assert!(eco.gang_of("poor").unwrap().is_none());
        assert!(matches!(eco.gang_info("Foo"), Err(EconomyError::NotFound("gang"))));

        assert!(matches!(eco.create_gang("poor", "   ", at(0)), Err(EconomyError::InvalidName)));
        let long = "x".repeat(33);
        assert!(matches!(eco.create_gang("poor", &long, at(0)), Err(EconomyError::InvalidName)));
    }

    #[test]
    fn membership_is_exclusive() {
        let (eco, _) = crew();
        eco.create_gang("loner", "Bar", at(3)).unwrap();
        assert!(matches!(
            eco.join_gang("grunt", "Bar", at(4)),
            Err(EconomyError::AlreadyInGang)
        ));
        assert!(matches!(
            eco.create_gang("grunt", "Baz", at(4)),
            Err(EconomyError::AlreadyInGang)
        ));
        assert!(matches!(
            eco.join_gang("nobody", "Bar", at(4)),
            Err(EconomyError::NotFound("account"))
        ));
    }

    #[test]
    fn leader_cannot_leave() {
        let (eco, gang) = crew();
        assert!(matches!(eco.leave_gang("boss"), Err(EconomyError::LeaderCannotLeave)));
        let info = eco.gang_info("Foo").unwrap();
        assert_eq!(info.members.len(), 3);
        assert_eq!(leaders(&eco, gang.id), 1);

        eco.leave_gang("grunt").unwrap();
        assert!(eco.gang_of("grunt").unwrap().is_none());
        assert!(matches!(eco.leave_gang("grunt"), Err(EconomyError::NotInGang)));
    }

    #[test]
    fn promotion_rules() {
        let (eco, _) = crew();
        assert!(matches!(
            eco.promote("agent", "grunt", GangRole::Agent),
            Err(EconomyError::Forbidden)
        ));
        assert!(matches!(
            eco.promote("boss", "grunt", GangRole::Leader),
            Err(EconomyError::InvalidRole)
        ));
        assert!(matches!(
            eco.promote("boss", "boss", GangRole::Member),
            Err(EconomyError::InvalidTarget)
        ));
        assert!(matches!(
            eco.promote("boss", "loner", GangRole::Agent),
            Err(EconomyError::NotInSameGang)
        ));

        let member = eco.promote("boss", "grunt", GangRole::Agent).unwrap();
        assert_eq!(member.role, GangRole::Agent);
        // Joined-at survives the role change.
        assert_eq!(member.joined_at, at(1));
    }

    #[test]
    fn kicking() {
        let (eco, _) = crew();
        assert!(matches!(eco.kick("grunt", "agent"), Err(EconomyError::Forbidden)));
        assert!(matches!(eco.kick("agent", "boss"), Err(EconomyError::CannotKickLeader)));
        assert!(matches!(eco.kick("agent", "agent"), Err(EconomyError::InvalidTarget)));

        eco.kick("agent", "grunt").unwrap();
        assert!(eco.gang_of("grunt").unwrap().is_none());
    }

    #[test]
    fn vault_flows() {
        let (eco, _) = crew();
        let deposit = eco.deposit("grunt", 60).unwrap();
        assert_eq!(deposit, VaultReceipt { amount: 60, vault: 60, balance: 40 });
        assert!(matches!(eco.deposit("grunt", 41), Err(EconomyError::InsufficientFunds)));
        assert!(matches!(eco.deposit("loner", 10), Err(EconomyError::NotInGang)));

        assert!(matches!(eco.withdraw("grunt", 10), Err(EconomyError::Forbidden)));
        assert!(matches!(eco.withdraw("agent", 61), Err(EconomyError::InsufficientFunds)));
        let withdrawal = eco.withdraw("agent", 60).unwrap();
        assert_eq!(withdrawal, VaultReceipt { amount: 60, vault: 0, balance: 160 });
    }

    #[test]
    fn leadership_transfer_keeps_one_leader() {
        let (eco, gang) = crew();
        let updated = eco.transfer_leadership("boss", "grunt").unwrap();
        assert_eq!(updated.leader_id, "grunt");
        assert_eq!(leaders(&eco, gang.id), 1);

        let info = eco.gang_info("Foo").unwrap();
        let role_of = |id: &str| info.members.iter().find(|m| m.user_id == id).map(|m| m.role);
        assert_eq!(role_of("grunt"), Some(GangRole::Leader));
        assert_eq!(role_of("boss"), Some(GangRole::Agent));

        eco.leave_gang("boss").unwrap();
    }

    #[test]
    fn disband_refunds_the_vault() {
        let (eco, gang) = crew();
        eco.deposit("grunt", 100).unwrap();
        assert!(matches!(eco.disband("agent"), Err(EconomyError::Forbidden)));

        let disbanded = eco.disband("boss").unwrap();
        assert_eq!(disbanded.refunded, 100);
        assert_eq!(disbanded.balance, 100);
        assert!(eco.gang_of("grunt").unwrap().is_none());
        assert_eq!(leaders(&eco, gang.id), 0);

        // The name is free again.
        eco.create_gang("loner", "Foo", at(10)).unwrap();
    }

    #[test]
    fn leaderboard_orders_by_level() {
        let (eco, _) = crew();
        eco.create_gang("loner", "Bar", at(3)).unwrap();
        eco.db()
            .with_conn(|c| {
                c.execute("UPDATE gangs SET level = 3 WHERE name = 'Bar'", [])?;
                Ok(())
            })
            .unwrap();
        let names: Vec<String> = eco
            .gang_leaderboard(10)
            .unwrap()
            .into_iter()
            .map(|g| g.name)
            .collect();
        assert_eq!(names, vec!["Bar", "Foo"]);
    }
}
