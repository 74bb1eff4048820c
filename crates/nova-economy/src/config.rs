use std::ops::RangeInclusive;
use std::str::FromStr;

use anyhow::{Context, bail};
use chrono::TimeDelta;

/// Every tunable of the economy. `Default` carries the production values;
/// `from_env` lets a deployment override any of them with `NOVA_*` variables.
#[derive(Debug, Clone)]
pub struct EconomyConfig {
    pub daily_amount: i64,
    pub daily_cooldown: TimeDelta,
    pub work_cooldown: TimeDelta,
    pub work_reward: RangeInclusive<i64>,

    pub rob_cooldown: TimeDelta,
    pub rob_success_chance: f64,
    pub rob_min_target_balance: i64,
    /// Share of the target's balance taken on success, in percent.
    pub rob_steal_percent: i64,
    /// Share of the robber's own balance lost on failure, in percent.
    pub rob_fine_percent: i64,

    pub gang_creation_cost: i64,
    pub gang_name_max_len: usize,

    pub wager_experience: i64,
    pub message_experience: i64,
    pub voice_experience_per_block: i64,
    pub voice_block_minutes: i64,

    pub drop_chance: f64,
    pub drop_amount: RangeInclusive<i64>,
    pub drop_window: TimeDelta,

    pub premium_background_cost: i64,
    pub premium_nameplate_cost: i64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            daily_amount: 100,
            daily_cooldown: TimeDelta::hours(24),
            work_cooldown: TimeDelta::hours(1),
            work_reward: 25..=75,
            rob_cooldown: TimeDelta::minutes(20),
            rob_success_chance: 0.6,
            rob_min_target_balance: 100,
            rob_steal_percent: 10,
            rob_fine_percent: 5,
            gang_creation_cost: 1000,
            gang_name_max_len: 32,
            wager_experience: 10,
            message_experience: 5,
            voice_experience_per_block: 10,
            voice_block_minutes: 5,
            drop_chance: 0.005,
            drop_amount: 10..=50,
            drop_window: TimeDelta::seconds(30),
            premium_background_cost: 500,
            premium_nameplate_cost: 300,
        }
    }
}

impl EconomyConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let d = Self::default();

        let config = Self {
            daily_amount: env_or("NOVA_DAILY_AMOUNT", d.daily_amount)?,
            daily_cooldown: secs_or("NOVA_DAILY_COOLDOWN_SECS", d.daily_cooldown)?,
            work_cooldown: secs_or("NOVA_WORK_COOLDOWN_SECS", d.work_cooldown)?,
            work_reward: env_or("NOVA_WORK_REWARD_MIN", *d.work_reward.start())?
                ..=env_or("NOVA_WORK_REWARD_MAX", *d.work_reward.end())?,
            rob_cooldown: secs_or("NOVA_ROB_COOLDOWN_SECS", d.rob_cooldown)?,
            rob_success_chance: env_or("NOVA_ROB_SUCCESS_CHANCE", d.rob_success_chance)?,
            rob_min_target_balance: env_or("NOVA_ROB_MIN_TARGET_BALANCE", d.rob_min_target_balance)?,
            rob_steal_percent: env_or("NOVA_ROB_STEAL_PERCENT", d.rob_steal_percent)?,
            rob_fine_percent: env_or("NOVA_ROB_FINE_PERCENT", d.rob_fine_percent)?,
            gang_creation_cost: env_or("NOVA_GANG_CREATION_COST", d.gang_creation_cost)?,
            gang_name_max_len: env_or("NOVA_GANG_NAME_MAX_LEN", d.gang_name_max_len)?,
            wager_experience: env_or("NOVA_WAGER_EXPERIENCE", d.wager_experience)?,
            message_experience: env_or("NOVA_MESSAGE_EXPERIENCE", d.message_experience)?,
            voice_experience_per_block: env_or(
                "NOVA_VOICE_EXPERIENCE_PER_BLOCK",
                d.voice_experience_per_block,
            )?,
            voice_block_minutes: env_or("NOVA_VOICE_BLOCK_MINUTES", d.voice_block_minutes)?,
            drop_chance: env_or("NOVA_DROP_CHANCE", d.drop_chance)?,
            drop_amount: env_or("NOVA_DROP_AMOUNT_MIN", *d.drop_amount.start())?
                ..=env_or("NOVA_DROP_AMOUNT_MAX", *d.drop_amount.end())?,
            drop_window: secs_or("NOVA_DROP_WINDOW_SECS", d.drop_window)?,
            premium_background_cost: env_or("NOVA_PREMIUM_BACKGROUND_COST", d.premium_background_cost)?,
            premium_nameplate_cost: env_or("NOVA_PREMIUM_NAMEPLATE_COST", d.premium_nameplate_cost)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, p) in [
            ("rob_success_chance", self.rob_success_chance),
            ("drop_chance", self.drop_chance),
        ] {
            if !(0.0..=1.0).contains(&p) {
                bail!("{} must be within 0..=1, got {}", name, p);
            }
        }
        for (name, pct) in [
            ("rob_steal_percent", self.rob_steal_percent),
            ("rob_fine_percent", self.rob_fine_percent),
        ] {
            if !(0..=100).contains(&pct) {
                bail!("{} must be within 0..=100, got {}", name, pct);
            }
        }
        if self.work_reward.is_empty() {
            bail!("work reward range is empty");
        }
        if self.drop_amount.is_empty() {
            bail!("drop amount range is empty");
        }
        if self.voice_block_minutes < 1 {
            bail!("voice_block_minutes must be at least 1");
        }
        Ok(())
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().with_context(|| format!("invalid {}: '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

fn secs_or(key: &str, default: TimeDelta) -> anyhow::Result<TimeDelta> {
    let secs = env_or(key, default.num_seconds())?;
    Ok(TimeDelta::seconds(secs))
}
