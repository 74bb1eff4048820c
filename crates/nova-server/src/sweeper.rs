use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use nova_api::AppState;

/// Background task that tears down lapsed state.
///
/// Runs on an interval: unclaimed drops past their claim window are removed,
/// and moderation records past `expires_at` are deactivated. Failures are
/// logged and the loop carries on.
pub async fn run_sweep_loop(state: AppState, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));

    loop {
        interval.tick().await;

        match sweep(state.clone()).await {
            Ok((drops, records)) => {
                if drops > 0 || records > 0 {
                    info!(
                        "Sweep: expired {} drops, deactivated {} moderation records",
                        drops, records
                    );
                } else {
                    debug!("Sweep: nothing to expire");
                }
            }
            Err(e) => {
                warn!("Sweep error: {:#}", e);
            }
        }
    }
}

async fn sweep(state: AppState) -> anyhow::Result<(usize, usize)> {
    let counts = tokio::task::spawn_blocking(move || {
        let now = Utc::now();
        let drops = state.economy.sweep_expired_drops(now)?;
        for drop_id in &drops {
            debug!("Swept unclaimed drop {}", drop_id);
        }
        let records = state.economy.sweep_expired_moderation(now)?;
        Ok::<_, nova_economy::EconomyError>((drops.len(), records))
    })
    .await??;
    Ok(counts)
}
