use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::manager::{ForecastCacheManager, RefreshOutcome};

/// Run the first refresh inline, then hand the rest to a background task.
pub async fn start(
    manager: Arc<ForecastCacheManager>,
    period: Duration,
    cancellation_token: CancellationToken,
) -> (RefreshOutcome, JoinHandle<()>) {
    let anchor = Instant::now();

    info!("Warming forecast cache");
    let warm_up = manager.refresh_all().await;
    info!(
        succeeded = warm_up.succeeded,
        failed = warm_up.failed,
        "Forecast cache warm-up finished"
    );

    let (first_tick, _) = next_grid_tick(anchor, period, Instant::now());
    let handle = spawn_refresh_loop(manager, first_tick, period, cancellation_token);
    (warm_up, handle)
}

/// Refresh at `first_tick + k * period` until cancelled.
///
/// A cycle that overruns its period drops the grid points it missed and waits
/// for the next one, so cycle starts never drift from the grid. `period` must
/// be non-zero.
pub fn spawn_refresh_loop(
    manager: Arc<ForecastCacheManager>,
    first_tick: Instant,
    period: Duration,
    cancellation_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut next_tick = first_tick;

        info!(period_secs = period.as_secs(), "Forecast refresh loop started");

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    info!("Forecast refresh loop stopped");
                    break;
                }
                _ = sleep_until(next_tick) => {}
            }

            manager.refresh_all().await;

            let (tick, missed) = next_grid_tick(next_tick, period, Instant::now());
            if missed > 0 {
                warn!(missed, "Refresh cycle overran its period, skipping missed ticks");
            }
            next_tick = tick;
        }
    })
}

/// Next grid point at or after `now`, plus how many were passed over on the way.
fn next_grid_tick(scheduled: Instant, period: Duration, now: Instant) -> (Instant, u32) {
    let next = scheduled + period;
    if next >= now {
        return (next, 0);
    }

    let missed = ((now - next).as_nanos() / period.as_nanos()) as u32 + 1;
    (next + period * missed, missed)
}
