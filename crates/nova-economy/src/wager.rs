//! Randomized games, robbery and peer transfers.
//!
//! Every game is split in two: a pure draw ([`Play`]) built from an injected
//! RNG, and [`Economy::settle`], which applies the play's net delta and the
//! flat wager experience in one transaction. The balance check and the write
//! are one guarded statement, so a stake can never be spent twice.

use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use nova_db::models::to_millis;
use nova_db::users::{self, Cooldown};
use nova_types::models::{CoinSide, RouletteColor};

use crate::ledger::{LevelProgress, credit, debit, grant_experience, require_account};
use crate::{Economy, EconomyError, Result, remaining};

pub const SLOT_SYMBOLS: [&str; 8] = ["🍎", "🍊", "🍋", "🍇", "🍓", "💎", "⭐", "💰"];

pub const RED_NUMBERS: [u8; 18] = [
    1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36,
];

pub fn roulette_color(number: u8) -> RouletteColor {
    if number == 0 {
        RouletteColor::Green
    } else if RED_NUMBERS.contains(&number) {
        RouletteColor::Red
    } else {
        RouletteColor::Black
    }
}

/// Jackpot multiplier for three matching reels.
fn slot_multiplier(symbol: &str) -> i64 {
    match symbol {
        "💰" => 10,
        "💎" => 8,
        "⭐" => 6,
        _ => 4,
    }
}

/// `amount * percent / 100` computed in `i128` and saturated to `i64`.
fn percent_of(amount: i64, percent: i64) -> i64 {
    let share = i128::from(amount) * i128::from(percent) / 100;
    share.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// One drawn game outcome, before any money moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum Play {
    Coinflip { call: CoinSide, landed: CoinSide },
    Dice { guess: u8, rolled: u8 },
    Slots { reels: [&'static str; 3] },
    Blackjack { player: [u8; 2], dealer: [u8; 2] },
    Roulette { bet: RouletteColor, number: u8 },
}

impl Play {
    pub fn coinflip(call: CoinSide, rng: &mut impl Rng) -> Self {
        let landed = if rng.random_bool(0.5) {
            CoinSide::Heads
        } else {
            CoinSide::Tails
        };
        Self::Coinflip { call, landed }
    }

    pub fn dice(guess: u8, rng: &mut impl Rng) -> Self {
        Self::Dice {
            guess,
            rolled: rng.random_range(1..=6),
        }
    }

    pub fn slots(rng: &mut impl Rng) -> Self {
        let mut spin = || SLOT_SYMBOLS[rng.random_range(0..SLOT_SYMBOLS.len())];
        Self::Slots {
            reels: [spin(), spin(), spin()],
        }
    }

    pub fn blackjack(rng: &mut impl Rng) -> Self {
        let mut card = || rng.random_range(1..=10);
        Self::Blackjack {
            player: [card(), card()],
            dealer: [card(), card()],
        }
    }

    pub fn roulette(bet: RouletteColor, rng: &mut impl Rng) -> Self {
        Self::Roulette {
            bet,
            number: rng.random_range(0..=36),
        }
    }

    /// Signed change to the player's balance for `stake`, `None` if the
    /// payout does not fit in an `i64`.
    pub fn net_delta(&self, stake: i64) -> Option<i64> {
        let delta = match self {
            Self::Coinflip { call, landed } => {
                if call == landed {
                    stake
                } else {
                    -stake
                }
            }
            Self::Dice { guess, rolled } => {
                if guess == rolled {
                    stake.checked_mul(4)?
                } else {
                    -stake
                }
            }
            Self::Slots { reels: [a, b, c] } => {
                if a == b && b == c {
                    stake.checked_mul(slot_multiplier(a))?
                } else if a == b || b == c || a == c {
                    stake / 2
                } else {
                    -stake
                }
            }
            Self::Blackjack { player, dealer } => {
                let player: u8 = player.iter().sum();
                let dealer: u8 = dealer.iter().sum();
                if player == 21 {
                    stake
                } else if player > 21 {
                    -stake
                } else if dealer > 21 || player > dealer {
                    stake
                } else if player < dealer {
                    -stake
                } else {
                    0
                }
            }
            Self::Roulette { bet, number } => match (roulette_color(*number), *bet) {
                (RouletteColor::Green, RouletteColor::Green) => stake.checked_mul(35)?,
                (landed, bet) if landed == bet => stake,
                _ => -stake,
            },
        };
        Some(delta)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WagerReceipt {
    pub play: Play,
    pub stake: i64,
    pub delta: i64,
    pub balance: i64,
    pub progress: LevelProgress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RobOutcome {
    Success {
        stolen: i64,
        doubled: bool,
        actor_balance: i64,
        target_balance: i64,
    },
    Caught {
        fine: i64,
        actor_balance: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    pub amount: i64,
    pub sender_balance: i64,
    pub recipient_balance: i64,
}

fn check_stake(stake: i64) -> Result<()> {
    if stake < 1 {
        return Err(EconomyError::InsufficientFunds);
    }
    Ok(())
}

impl Economy {
    pub fn coinflip(
        &self,
        user_id: &str,
        stake: i64,
        call: CoinSide,
        rng: &mut impl Rng,
    ) -> Result<WagerReceipt> {
        check_stake(stake)?;
        self.settle(user_id, stake, Play::coinflip(call, rng))
    }

    pub fn dice(&self, user_id: &str, stake: i64, guess: u8, rng: &mut impl Rng) -> Result<WagerReceipt> {
        check_stake(stake)?;
        if !(1..=6).contains(&guess) {
            return Err(EconomyError::InvalidBet);
        }
        self.settle(user_id, stake, Play::dice(guess, rng))
    }

    pub fn slots(&self, user_id: &str, stake: i64, rng: &mut impl Rng) -> Result<WagerReceipt> {
        check_stake(stake)?;
        self.settle(user_id, stake, Play::slots(rng))
    }

    pub fn blackjack(&self, user_id: &str, stake: i64, rng: &mut impl Rng) -> Result<WagerReceipt> {
        check_stake(stake)?;
        self.settle(user_id, stake, Play::blackjack(rng))
    }

    pub fn roulette(
        &self,
        user_id: &str,
        stake: i64,
        bet: RouletteColor,
        rng: &mut impl Rng,
    ) -> Result<WagerReceipt> {
        check_stake(stake)?;
        self.settle(user_id, stake, Play::roulette(bet, rng))
    }

    /// Applies a drawn play: requires `balance >= stake`, adds the net delta
    /// and grants the wager experience, all or nothing. The stake is checked
    /// against the balance before any payout is computed.
    pub fn settle(&self, user_id: &str, stake: i64, play: Play) -> Result<WagerReceipt> {
        check_stake(stake)?;
        let experience = self.config.wager_experience;

        let receipt = self.db.with_tx(|tx| {
            let account = require_account(tx, user_id)?;
            if account.coins < stake {
                return Err(EconomyError::InsufficientFunds);
            }
            let delta = play
                .net_delta(stake)
                .filter(|delta| account.coins.checked_add(*delta).is_some())
                .ok_or(EconomyError::InvalidAmount)?;

            let balance = users::add_coins_guarded(tx, user_id, delta, stake)?
                .ok_or(EconomyError::InsufficientFunds)?;
            let progress = grant_experience(tx, user_id, experience)?;
            Ok(WagerReceipt {
                play,
                stake,
                delta,
                balance,
                progress,
            })
        })?;

        debug!("{} staked {} and got {:+}", user_id, stake, receipt.delta);
        if receipt.progress.leveled_up {
            info!("{} reached level {}", user_id, receipt.progress.level);
        }
        Ok(receipt)
    }

    pub fn rob(
        &self,
        actor_id: &str,
        target_id: &str,
        now: DateTime<Utc>,
        rng: &mut impl Rng,
    ) -> Result<RobOutcome> {
        let succeeded = rng.random_bool(self.config.rob_success_chance);
        self.rob_with_outcome(actor_id, target_id, now, succeeded)
    }

    /// Robbery with the coin already tossed. Preconditions are checked in
    /// order: self-target, actor cooldown, target protection, target balance.
    /// The actor's cooldown is stamped whether the attempt succeeds or not.
    pub fn rob_with_outcome(
        &self,
        actor_id: &str,
        target_id: &str,
        now: DateTime<Utc>,
        succeeded: bool,
    ) -> Result<RobOutcome> {
        if actor_id == target_id {
            return Err(EconomyError::InvalidTarget);
        }
        let cfg = &self.config;

        let outcome = self.db.with_tx(|tx| {
            let actor = require_account(tx, actor_id)?;
            let target = require_account(tx, target_id)?;

            let wait = remaining(actor.rob_last, cfg.rob_cooldown, now);
            if wait > TimeDelta::zero() {
                return Err(EconomyError::CooldownActive { remaining: wait });
            }
            if target.rob_protected(now) {
                return Err(EconomyError::TargetProtected {
                    until: target.rob_protection_until.unwrap_or(now),
                });
            }
            if target.coins < cfg.rob_min_target_balance {
                return Err(EconomyError::TargetTooPoor);
            }

            if succeeded {
                let doubled = actor.double_rob_active(now);
                let mut stolen = percent_of(target.coins, cfg.rob_steal_percent);
                if doubled {
                    stolen = stolen.saturating_mul(2).min(target.coins);
                }
                if actor.coins.checked_add(stolen).is_none() {
                    return Err(EconomyError::InvalidAmount);
                }
                users::stamp_cooldown(tx, actor_id, Cooldown::Rob, to_millis(now))?;
                let target_balance = debit(tx, target_id, stolen)?;
                let actor_balance = credit(tx, actor_id, stolen)?;
                Ok(RobOutcome::Success {
                    stolen,
                    doubled,
                    actor_balance,
                    target_balance,
                })
            } else {
                // Fines leave circulation; a negative balance is never fined into a credit.
                let fine = percent_of(actor.coins, cfg.rob_fine_percent).max(0);
                users::stamp_cooldown(tx, actor_id, Cooldown::Rob, to_millis(now))?;
                let actor_balance = credit(tx, actor_id, -fine)?;
                Ok(RobOutcome::Caught { fine, actor_balance })
            }
        })?;

        match &outcome {
            RobOutcome::Success { stolen, .. } => {
                info!("{} robbed {} of {}", actor_id, target_id, stolen)
            }
            RobOutcome::Caught { fine, .. } => {
                info!("{} was caught robbing {} and fined {}", actor_id, target_id, fine)
            }
        }
        Ok(outcome)
    }

    /// Moves `amount` from sender to recipient, or nothing at all.
    pub fn give(&self, sender_id: &str, recipient_id: &str, amount: i64) -> Result<TransferReceipt> {
        if sender_id == recipient_id {
            return Err(EconomyError::InvalidTarget);
        }
        if amount < 1 {
            return Err(EconomyError::InvalidAmount);
        }

        let receipt = self.db.with_tx(|tx| {
            require_account(tx, recipient_id)?;
            let sender_balance = debit(tx, sender_id, amount)?;
            let recipient_balance = credit(tx, recipient_id, amount)?;
            Ok::<_, EconomyError>(TransferReceipt {
                amount,
                sender_balance,
                recipient_balance,
            })
        })?;

        debug!("{} gave {} to {}", sender_id, amount, recipient_id);
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use nova_db::users::StatusWindow;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::testing::{at, economy_with};

    #[test]
    fn game_payouts() {
        let won = Play::Coinflip { call: CoinSide::Heads, landed: CoinSide::Heads };
        let lost = Play::Coinflip { call: CoinSide::Heads, landed: CoinSide::Tails };
        assert_eq!(won.net_delta(40), Some(40));
        assert_eq!(lost.net_delta(40), Some(-40));

        assert_eq!(Play::Dice { guess: 3, rolled: 3 }.net_delta(10), Some(40));
        assert_eq!(Play::Dice { guess: 3, rolled: 4 }.net_delta(10), Some(-10));

        assert_eq!(Play::Slots { reels: ["💰", "💰", "💰"] }.net_delta(10), Some(100));
        assert_eq!(Play::Slots { reels: ["🍎", "🍎", "🍎"] }.net_delta(10), Some(40));
        assert_eq!(Play::Slots { reels: ["🍎", "🍋", "🍎"] }.net_delta(5), Some(2));
        assert_eq!(Play::Slots { reels: ["🍎", "🍋", "💎"] }.net_delta(5), Some(-5));

        assert_eq!(Play::Blackjack { player: [10, 9], dealer: [9, 8] }.net_delta(10), Some(10));
        assert_eq!(Play::Blackjack { player: [5, 5], dealer: [9, 8] }.net_delta(10), Some(-10));
        assert_eq!(Play::Blackjack { player: [9, 8], dealer: [8, 9] }.net_delta(10), Some(0));

        let green = Play::Roulette { bet: RouletteColor::Green, number: 0 };
        assert_eq!(green.net_delta(2), Some(70));
        assert_eq!(green.net_delta(i64::MAX / 10), None);
        assert_eq!(Play::Roulette { bet: RouletteColor::Red, number: 1 }.net_delta(2), Some(2));
        assert_eq!(Play::Roulette { bet: RouletteColor::Black, number: 1 }.net_delta(2), Some(-2));
    }

    #[test]
    fn oversized_stake_is_refused_before_payout() {
        let eco = economy_with(&[("u1", 100), ("whale", i64::MAX / 2)]);
        let green = Play::Roulette { bet: RouletteColor::Green, number: 0 };

        assert!(matches!(
            eco.settle("u1", i64::MAX / 10, green.clone()),
            Err(EconomyError::InsufficientFunds)
        ));
        assert!(matches!(
            eco.settle("whale", i64::MAX / 10, green),
            Err(EconomyError::InvalidAmount)
        ));

        let whale = eco.account("whale").unwrap();
        assert_eq!((whale.coins, whale.experience), (i64::MAX / 2, 0));
        assert_eq!(eco.account("u1").unwrap().coins, 100);
    }

    #[test]
    fn rob_arithmetic_holds_for_extreme_balances() {
        let eco = economy_with(&[("robber", i64::MAX), ("victim", i64::MAX)]);
        let outcome = eco.rob_with_outcome("robber", "victim", at(0), false).unwrap();
        let fine = i64::MAX / 100 * 5 + i64::MAX % 100 * 5 / 100;
        assert_eq!(outcome, RobOutcome::Caught { fine, actor_balance: i64::MAX - fine });

        let eco = economy_with(&[("robber", i64::MAX - 1), ("victim", i64::MAX)]);
        assert!(matches!(
            eco.rob_with_outcome("robber", "victim", at(0), true),
            Err(EconomyError::InvalidAmount)
        ));
        assert_eq!(eco.account("robber").unwrap().rob_last, None);
        assert_eq!(eco.account("victim").unwrap().coins, i64::MAX);
    }

    #[test]
    fn stake_must_be_covered() {
        let eco = economy_with(&[("u1", 30)]);
        let mut rng = StdRng::seed_from_u64(1);

        assert!(matches!(
            eco.coinflip("u1", 0, CoinSide::Heads, &mut rng),
            Err(EconomyError::InsufficientFunds)
        ));
        assert!(matches!(
            eco.slots("u1", 31, &mut rng),
            Err(EconomyError::InsufficientFunds)
        ));
        assert!(matches!(eco.dice("u1", 5, 7, &mut rng), Err(EconomyError::InvalidBet)));

        let account = eco.account("u1").unwrap();
        assert_eq!((account.coins, account.experience), (30, 0));
    }

    #[test]
    fn losing_still_grants_experience() {
        let eco = economy_with(&[("u1", 30)]);
        let lost = Play::Coinflip { call: CoinSide::Heads, landed: CoinSide::Tails };
        let receipt = eco.settle("u1", 30, lost).unwrap();
        assert_eq!(receipt.delta, -30);
        assert_eq!(receipt.balance, 0);
        assert_eq!(receipt.progress.experience, 10);
    }

    #[test]
    fn coinflip_is_fair() {
        let mut rng = StdRng::seed_from_u64(42);
        let n = 100_000;
        let wins = (0..n)
            .filter(|_| Play::coinflip(CoinSide::Heads, &mut rng).net_delta(1) > Some(0))
            .count();
        let rate = wins as f64 / n as f64;
        assert!((rate - 0.5).abs() < 0.01, "win rate {}", rate);
    }

    #[test]
    fn roulette_colors_follow_the_wheel() {
        let mut rng = StdRng::seed_from_u64(42);
        let n = 100_000;
        let mut counts: HashMap<RouletteColor, usize> = HashMap::new();
        for _ in 0..n {
            if let Play::Roulette { number, .. } = Play::roulette(RouletteColor::Red, &mut rng) {
                *counts.entry(roulette_color(number)).or_default() += 1;
            }
        }

        let share = |color| counts.get(&color).copied().unwrap_or(0) as f64 / n as f64;
        assert!((share(RouletteColor::Red) - 18.0 / 37.0).abs() < 0.01);
        assert!((share(RouletteColor::Black) - 18.0 / 37.0).abs() < 0.01);
        assert!((share(RouletteColor::Green) - 1.0 / 37.0).abs() < 0.005);
    }

    #[test]
    fn give_without_funds_changes_nothing() {
        let eco = economy_with(&[("a", 50), ("b", 5)]);
        assert!(matches!(eco.give("a", "b", 100), Err(EconomyError::InsufficientFunds)));
        assert_eq!(eco.account("a").unwrap().coins, 50);
        assert_eq!(eco.account("b").unwrap().coins, 5);

        assert!(matches!(eco.give("a", "a", 10), Err(EconomyError::InvalidTarget)));
        let receipt = eco.give("a", "b", 50).unwrap();
        assert_eq!((receipt.sender_balance, receipt.recipient_balance), (0, 55));
    }

    #[test]
    fn successful_rob_takes_a_tenth() {
        let eco = economy_with(&[("robber", 0), ("victim", 1000)]);
        let outcome = eco.rob_with_outcome("robber", "victim", at(0), true).unwrap();
        assert_eq!(
            outcome,
            RobOutcome::Success {
                stolen: 100,
                doubled: false,
                actor_balance: 100,
                target_balance: 900,
            }
        );
        assert_eq!(eco.account("robber").unwrap().rob_last, Some(at(0)));
    }

    #[test]
    fn double_rob_window_doubles_the_take() {
        let eco = economy_with(&[("robber", 0), ("victim", 1000)]);
        eco.db()
            .with_conn(|c| {
                users::set_status_until(c, "robber", StatusWindow::DoubleRob, to_millis(at(60)))
            })
            .unwrap();

        let outcome = eco.rob_with_outcome("robber", "victim", at(0), true).unwrap();
        assert!(matches!(outcome, RobOutcome::Success { stolen: 200, doubled: true, .. }));
        assert_eq!(eco.account("victim").unwrap().coins, 800);
    }

    #[test]
    fn failed_rob_fines_and_stamps_cooldown() {
        let eco = economy_with(&[("robber", 200), ("victim", 1000)]);
        let outcome = eco.rob_with_outcome("robber", "victim", at(0), false).unwrap();
        assert_eq!(outcome, RobOutcome::Caught { fine: 10, actor_balance: 190 });
        assert_eq!(eco.account("victim").unwrap().coins, 1000);

        let again = eco.rob_with_outcome("robber", "victim", at(60), true);
        match again {
            Err(EconomyError::CooldownActive { remaining }) => {
                assert_eq!(remaining, TimeDelta::minutes(19));
            }
            other => panic!("expected cooldown, got {:?}", other),
        }

        assert!(eco.rob_with_outcome("robber", "victim", at(20 * 60), true).is_ok());
    }

    #[test]
    fn negative_balance_is_not_fined_into_credit() {
        let eco = economy_with(&[("robber", -400), ("victim", 1000)]);
        let outcome = eco.rob_with_outcome("robber", "victim", at(0), false).unwrap();
        assert_eq!(outcome, RobOutcome::Caught { fine: 0, actor_balance: -400 });
    }

    #[test]
    fn rob_preconditions() {
        let eco = economy_with(&[("robber", 0), ("victim", 1000), ("poor", 99)]);
        assert!(matches!(
            eco.rob_with_outcome("robber", "robber", at(0), true),
            Err(EconomyError::InvalidTarget)
        ));
        assert!(matches!(
            eco.rob_with_outcome("robber", "poor", at(0), true),
            Err(EconomyError::TargetTooPoor)
        ));

        eco.db()
            .with_conn(|c| {
                users::set_status_until(c, "victim", StatusWindow::RobProtection, to_millis(at(600)))
            })
            .unwrap();
        match eco.rob_with_outcome("robber", "victim", at(0), true) {
            Err(EconomyError::TargetProtected { until }) => assert_eq!(until, at(600)),
            other => panic!("expected protection, got {:?}", other),
        }

        // Refused attempts do not start the cooldown.
        assert_eq!(eco.account("robber").unwrap().rob_last, None);
    }
}
