use chrono::{DateTime, TimeDelta, Utc};

/// Every way a core operation can refuse. All variants except `Storage` are
/// expected outcomes the caller reports back to the user.
#[derive(Debug, thiserror::Error)]
pub enum EconomyError {
    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("cooldown active, {}s remaining", .remaining.num_seconds())]
    CooldownActive { remaining: TimeDelta },

    #[error("already in a gang")]
    AlreadyInGang,

    #[error("not in a gang")]
    NotInGang,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("not allowed for this gang role")]
    Forbidden,

    #[error("target is not in the same gang")]
    NotInSameGang,

    #[error("the gang leader cannot be kicked")]
    CannotKickLeader,

    #[error("the gang leader cannot leave; transfer leadership or disband first")]
    LeaderCannotLeave,

    #[error("a gang with that name already exists")]
    DuplicateName,

    #[error("invalid target")]
    InvalidTarget,

    #[error("invalid name")]
    InvalidName,

    #[error("amount must be positive")]
    InvalidAmount,

    #[error("invalid bet")]
    InvalidBet,

    #[error("role cannot be assigned this way")]
    InvalidRole,

    #[error("already owned")]
    AlreadyOwned,

    #[error("target is protected until {until}")]
    TargetProtected { until: DateTime<Utc> },

    #[error("target has too few coins to rob")]
    TargetTooPoor,

    #[error("nothing to change")]
    NothingToChange,

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, EconomyError>;

impl EconomyError {
    /// True for unexpected store failures, false for domain refusals.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Stable machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InsufficientFunds => "insufficient_funds",
            Self::CooldownActive { .. } => "cooldown_active",
            Self::AlreadyInGang => "already_in_gang",
            Self::NotInGang => "not_in_gang",
            Self::NotFound(_) => "not_found",
            Self::Forbidden => "forbidden",
            Self::NotInSameGang => "not_in_same_gang",
            Self::CannotKickLeader => "cannot_kick_leader",
            Self::LeaderCannotLeave => "leader_cannot_leave",
            Self::DuplicateName => "duplicate_name",
            Self::InvalidTarget => "invalid_target",
            Self::InvalidName => "invalid_name",
            Self::InvalidAmount => "invalid_amount",
            Self::InvalidBet => "invalid_bet",
            Self::InvalidRole => "invalid_role",
            Self::AlreadyOwned => "already_owned",
            Self::TargetProtected { .. } => "target_protected",
            Self::TargetTooPoor => "target_too_poor",
            Self::NothingToChange => "nothing_to_change",
            Self::Storage(_) => "storage",
        }
    }

    /// Seconds until a cooldown lapses, rounded up.
    pub fn retry_after_secs(&self) -> Option<i64> {
        match self {
            Self::CooldownActive { remaining } => {
                let ms = remaining.num_milliseconds();
                Some((ms + 999) / 1000)
            }
            _ => None,
        }
    }
}

/// Lock poisoning on in-memory trackers is reported like a store failure.
pub(crate) fn poisoned<T>(what: &str, err: std::sync::PoisonError<T>) -> EconomyError {
    EconomyError::Storage(anyhow::anyhow!("{} lock poisoned: {}", what, err))
}
