use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use nova_db::models::to_millis;
use nova_db::users::{self, Cooldown};
use nova_db::{Connection, gangs};
use nova_types::models::{Account, GangRole, LeaderboardMetric, level_for};

use crate::{Economy, EconomyError, Result, remaining};

const JOBS: [&str; 8] = [
    "pizza delivery driver",
    "dog walker",
    "street performer",
    "freelance coder",
    "coffee barista",
    "uber driver",
    "tutor",
    "photographer",
];

const FREE_STYLE: &str = "default";
const PREMIUM_BACKGROUNDS: [&str; 4] = ["galaxy", "ocean", "sunset", "forest"];
const PREMIUM_NAMEPLATES: [&str; 4] = ["gold", "silver", "rainbow", "neon"];

const MAX_LEADERBOARD: u32 = 100;

/// Experience after a grant, and whether it crossed a level threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelProgress {
    pub experience: i64,
    pub level: i64,
    pub leveled_up: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub account: Account,
    pub gang: Option<ProfileGang>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileGang {
    pub id: i64,
    pub name: String,
    pub role: GangRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyReceipt {
    pub amount: i64,
    pub balance: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkReceipt {
    pub job: &'static str,
    pub reward: i64,
    pub balance: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileChange {
    pub account: Account,
    pub cost: i64,
}

// -- Shared helpers for every component that touches balances --

pub(crate) fn require_account(conn: &Connection, user_id: &str) -> Result<Account> {
    users::get(conn, user_id)?.ok_or(EconomyError::NotFound("account"))
}

/// Guarded debit. Fails without writing if the balance is below `amount`.
pub(crate) fn debit(conn: &Connection, user_id: &str, amount: i64) -> Result<i64> {
    match users::add_coins_guarded(conn, user_id, -amount, amount)? {
        Some(balance) => Ok(balance),
        None => {
            require_account(conn, user_id)?;
            Err(EconomyError::InsufficientFunds)
        }
    }
}

pub(crate) fn credit(conn: &Connection, user_id: &str, amount: i64) -> Result<i64> {
    users::add_coins(conn, user_id, amount)?.ok_or(EconomyError::NotFound("account"))
}

pub(crate) fn grant_experience(conn: &Connection, user_id: &str, amount: i64) -> Result<LevelProgress> {
    let row = users::add_experience(conn, user_id, amount)?
        .ok_or(EconomyError::NotFound("account"))?;
    Ok(LevelProgress {
        experience: row.experience,
        level: row.level,
        leveled_up: row.level > level_for(row.experience - amount),
    })
}

fn style_cost(value: &str, premium: &[&str], price: i64) -> Result<i64> {
    if value == FREE_STYLE {
        Ok(0)
    } else if premium.contains(&value) {
        Ok(price)
    } else {
        Err(EconomyError::InvalidName)
    }
}

impl Economy {
    /// Create the account if absent. Returns whether it was created.
    pub fn ensure_account(&self, user_id: &str, username: &str) -> Result<bool> {
        let created = self.db.with_conn(|conn| users::ensure(conn, user_id, username))?;
        if created {
            debug!("Account created for {} ({})", username, user_id);
        }
        Ok(created)
    }

    pub fn account(&self, user_id: &str) -> Result<Account> {
        self.db
            .with_conn(|conn| users::get(conn, user_id))?
            .ok_or(EconomyError::NotFound("account"))
    }

    /// The account together with the gang it belongs to, if any.
    pub fn profile(&self, user_id: &str) -> Result<Profile> {
        let (account, gang) = self.db.with_conn(|conn| {
            let account = users::get(conn, user_id)?;
            let gang = match gangs::membership(conn, user_id)? {
                Some(member) => gangs::get(conn, member.gang_id)?.map(|g| ProfileGang {
                    id: g.id,
                    name: g.name,
                    role: member.role,
                }),
                None => None,
            };
            Ok((account, gang))
        })?;

        let account = account.ok_or(EconomyError::NotFound("account"))?;
        Ok(Profile { account, gang })
    }

    /// Applies a signed delta as one guarded statement. A debit larger than
    /// the balance fails with `InsufficientFunds` and writes nothing.
    pub fn adjust_balance(&self, user_id: &str, delta: i64) -> Result<i64> {
        self.db.with_tx(|tx| {
            if delta < 0 {
                let amount = delta.checked_neg().ok_or(EconomyError::InvalidAmount)?;
                debit(tx, user_id, amount)
            } else {
                credit(tx, user_id, delta)
            }
        })
    }

    pub fn add_experience(&self, user_id: &str, amount: i64) -> Result<LevelProgress> {
        if amount < 0 {
            return Err(EconomyError::InvalidAmount);
        }
        let progress = self.db.with_tx(|tx| grant_experience(tx, user_id, amount))?;
        if progress.leveled_up {
            info!("{} reached level {}", user_id, progress.level);
        }
        Ok(progress)
    }

    pub fn claim_daily(&self, user_id: &str, now: DateTime<Utc>) -> Result<DailyReceipt> {
        let amount = self.config.daily_amount;
        let window = self.config.daily_cooldown;

        self.db.with_tx(|tx| {
            let account = require_account(tx, user_id)?;
            let claimed = users::claim_cooldown(
                tx,
                user_id,
                Cooldown::Daily,
                to_millis(now),
                window.num_milliseconds(),
                amount,
            )?;

            match claimed {
                Some(balance) => Ok(DailyReceipt { amount, balance }),
                None => Err(EconomyError::CooldownActive {
                    remaining: remaining(account.daily_last, window, now),
                }),
            }
        })
    }

    pub fn work(&self, user_id: &str, now: DateTime<Utc>, rng: &mut impl Rng) -> Result<WorkReceipt> {
        let reward = rng.random_range(self.config.work_reward.clone());
        let job = JOBS[rng.random_range(0..JOBS.len())];
        let window = self.config.work_cooldown;

        self.db.with_tx(|tx| {
            let account = require_account(tx, user_id)?;
            let claimed = users::claim_cooldown(
                tx,
                user_id,
                Cooldown::Work,
                to_millis(now),
                window.num_milliseconds(),
                reward,
            )?;

            match claimed {
                Some(balance) => {
                    debug!("{} worked as a {} for {}", user_id, job, reward);
                    Ok(WorkReceipt { job, reward, balance })
                }
                None => Err(EconomyError::CooldownActive {
                    remaining: remaining(account.work_last, window, now),
                }),
            }
        })
    }

    pub fn leaderboard(&self, metric: LeaderboardMetric, limit: u32) -> Result<Vec<Account>> {
        let limit = limit.min(MAX_LEADERBOARD);
        Ok(self.db.with_conn(|conn| users::leaderboard(conn, metric, limit))?)
    }

    /// Sets the profile background and/or nameplate. Premium styles are
    /// charged only when they differ from the current value.
    pub fn customize_profile(
        &self,
        user_id: &str,
        background: Option<&str>,
        nameplate: Option<&str>,
    ) -> Result<ProfileChange> {
        let background_cost = background
            .map(|bg| style_cost(bg, &PREMIUM_BACKGROUNDS, self.config.premium_background_cost))
            .transpose()?;
        let nameplate_cost = nameplate
            .map(|np| style_cost(np, &PREMIUM_NAMEPLATES, self.config.premium_nameplate_cost))
            .transpose()?;

        self.db.with_tx(|tx| {
            let account = require_account(tx, user_id)?;
            let mut cost = 0;
            let mut changed = false;

            let new_background = match (background, background_cost) {
                (Some(bg), Some(price)) if bg != account.profile_background => {
                    cost += price;
                    changed = true;
                    bg
                }
                _ => account.profile_background.as_str(),
            };
            let new_nameplate = match (nameplate, nameplate_cost) {
                (Some(np), Some(price)) if np != account.profile_nameplate => {
                    cost += price;
                    changed = true;
                    np
                }
                _ => account.profile_nameplate.as_str(),
            };

            if !changed {
                return Err(EconomyError::NothingToChange);
            }

            users::set_profile(tx, user_id, new_background, new_nameplate, cost)?
                .ok_or(EconomyError::InsufficientFunds)?;
            let account = require_account(tx, user_id)?;
            Ok(ProfileChange { account, cost })
        })
    }

    // -- Administrative overrides. Unguarded: these may drive a balance negative. --

    pub fn admin_adjust_coins(&self, user_id: &str, delta: i64) -> Result<i64> {
        let balance = self
            .db
            .with_conn(|conn| users::add_coins(conn, user_id, delta))?
            .ok_or(EconomyError::NotFound("account"))?;
        warn!("Admin adjusted {} by {} (now {})", user_id, delta, balance);
        Ok(balance)
    }

    pub fn admin_set_coins(&self, user_id: &str, coins: i64) -> Result<i64> {
        let balance = self
            .db
            .with_conn(|conn| users::set_coins(conn, user_id, coins))?
            .ok_or(EconomyError::NotFound("account"))?;
        warn!("Admin set {} balance to {}", user_id, balance);
        Ok(balance)
    }

    pub fn admin_set_experience(&self, user_id: &str, experience: i64) -> Result<LevelProgress> {
        if experience < 0 {
            return Err(EconomyError::InvalidAmount);
        }
        let progress = self.db.with_tx(|tx| {
            let before = require_account(tx, user_id)?;
            let row = users::set_experience(tx, user_id, experience)?
                .ok_or(EconomyError::NotFound("account"))?;
            Ok::<_, EconomyError>(LevelProgress {
                experience: row.experience,
                level: row.level,
                leveled_up: row.level > before.level,
            })
        })?;
        warn!("Admin set {} experience to {}", user_id, experience);
        Ok(progress)
    }
}
