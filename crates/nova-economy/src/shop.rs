use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::info;

use nova_db::models::to_millis;
use nova_db::shop::{self as catalogue, Owner};
use nova_db::{gangs, users::{self, StatusWindow}};
use nova_types::models::{ItemEffect, ItemKind, Purchase, ShopItem};

use crate::ledger::{debit, require_account};
use crate::{Economy, EconomyError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReceipt {
    pub purchase: Purchase,
    pub balance: i64,
}

impl Economy {
    pub fn shop_items(&self, kind: Option<ItemKind>) -> Result<Vec<ShopItem>> {
        Ok(self.db.with_conn(|conn| catalogue::items(conn, kind))?)
    }

    /// Buys an item: price debit, purchase record and the item's status
    /// effect land together. Gang perks are owned by the buyer's gang.
    pub fn purchase(&self, user_id: &str, item_id: i64, now: DateTime<Utc>) -> Result<PurchaseReceipt> {
        let now_ms = to_millis(now);

        let (receipt, item_name) = self.db.with_tx(|tx| {
            let item = catalogue::item(tx, item_id)?.ok_or(EconomyError::NotFound("item"))?;
            require_account(tx, user_id)?;

            let gang_id = match item.kind {
                ItemKind::GangPerk => {
                    let member = gangs::membership(tx, user_id)?.ok_or(EconomyError::NotInGang)?;
                    Some(member.gang_id)
                }
                ItemKind::Perk => None,
            };
            let owner = match gang_id {
                Some(gang_id) => Owner::Gang(gang_id),
                None => Owner::User(user_id),
            };
            if catalogue::owns(tx, owner, item.id, now_ms)? {
                return Err(EconomyError::AlreadyOwned);
            }

            let balance = debit(tx, user_id, item.price)?;
            let expires_at = item.duration_secs.map(|secs| now + TimeDelta::seconds(secs));
            let expires_ms = expires_at.map(to_millis);
            let purchase_id =
                catalogue::insert_purchase(tx, user_id, gang_id, item.id, expires_ms, now_ms)?;

            let window = match item.effect {
                ItemEffect::RobProtection => Some(StatusWindow::RobProtection),
                ItemEffect::DoubleRob => Some(StatusWindow::DoubleRob),
                // Platform roles are granted by the caller.
                ItemEffect::Role => None,
            };
            if let (Some(window), Some(until)) = (window, expires_ms) {
                users::set_status_until(tx, user_id, window, until)?;
            }

            let purchase = catalogue::purchase(tx, purchase_id)?
                .ok_or(EconomyError::NotFound("purchase"))?;
            Ok::<_, EconomyError>((PurchaseReceipt { purchase, balance }, item.name))
        })?;

        info!("{} bought '{}'", user_id, item_name);
        Ok(receipt)
    }

    /// The user's unexpired purchases, newest first.
    pub fn purchases(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<Purchase>> {
        Ok(self
            .db
            .with_conn(|conn| catalogue::purchases_for(conn, user_id, to_millis(now)))?)
    }
}
