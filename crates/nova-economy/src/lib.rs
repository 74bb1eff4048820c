//! The economy and gang state-transition engine.
//!
//! [`Economy`] is the single entry point. Its operations are grouped by
//! concern across the modules below, each adding an `impl Economy` block:
//! balances and cooldowns in [`ledger`], randomized games and robbery in
//! [`wager`], group membership and vaults in [`gang`], passive message and
//! voice tracking in [`activity`]. Every operation takes plain identifiers and
//! an explicit `now`, and returns a typed [`EconomyError`] on failure.

pub mod activity;
pub mod config;
pub mod error;
pub mod gang;
pub mod ledger;
pub mod moderation;
pub mod shop;
pub mod social;
pub mod wager;

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use nova_db::Database;

pub use activity::ActivityTracker;
pub use config::EconomyConfig;
pub use error::{EconomyError, Result};

pub struct Economy {
    db: Arc<Database>,
    config: EconomyConfig,
    activity: ActivityTracker,
}

impl Economy {
    pub fn new(db: Arc<Database>, config: EconomyConfig) -> Self {
        Self {
            db,
            config,
            activity: ActivityTracker::default(),
        }
    }

    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }

    pub fn db(&self) -> &Database {
        &self.db
    }
}

/// Time left before a window that started at `last` closes, never negative.
pub(crate) fn remaining(last: Option<DateTime<Utc>>, window: TimeDelta, now: DateTime<Utc>) -> TimeDelta {
    match last {
        Some(last) => (last + window - now).max(TimeDelta::zero()),
        None => TimeDelta::zero(),
    }
}
