use serde::Serialize;
use tracing::debug;

use nova_db::reactions;
use nova_types::models::ReactionKind;

use crate::{Economy, EconomyError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReactionTally {
    pub kind: ReactionKind,
    /// How many times this actor has done this to this target.
    pub count: i64,
    /// How many of this kind the target has received from anyone.
    pub received_total: i64,
}

impl Economy {
    pub fn react(&self, actor_id: &str, target_id: &str, kind: ReactionKind) -> Result<ReactionTally> {
        if actor_id == target_id {
            return Err(EconomyError::InvalidTarget);
        }
        let tally = self.db.with_tx(|tx| {
            let count = reactions::increment(tx, actor_id, target_id, kind)?;
            let received_total = reactions::received_total(tx, target_id, kind)?;
            Ok::<_, EconomyError>(ReactionTally {
                kind,
                count,
                received_total,
            })
        })?;
        debug!("{} -> {} {} (#{})", actor_id, target_id, kind.as_str(), tally.count);
        Ok(tally)
    }

    pub fn reactions_received(&self, target_id: &str, kind: ReactionKind) -> Result<i64> {
        Ok(self
            .db
            .with_conn(|conn| reactions::received_total(conn, target_id, kind))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::economy;

    #[test]
    fn reactions_tally_per_pair_and_overall() {
        let eco = economy();
        eco.react("a", "t", ReactionKind::Hug).unwrap();
        let second = eco.react("a", "t", ReactionKind::Hug).unwrap();
        let other = eco.react("b", "t", ReactionKind::Hug).unwrap();
        assert_eq!(second.count, 2);
        assert_eq!((other.count, other.received_total), (1, 3));
        assert_eq!(eco.reactions_received("t", ReactionKind::Slap).unwrap(), 0);
        assert!(matches!(
            eco.react("a", "a", ReactionKind::Bonk),
            Err(EconomyError::InvalidTarget)
        ));
    }
}
