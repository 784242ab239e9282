//! Background task running the seeding job at every UTC midnight.

use crate::clock::{until_next_midnight, Clock, SharedClock};
use crate::seed::DailySeeder;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, Instrument};

async fn run_once(seeder: &DailySeeder, shutdown: watch::Receiver<bool>) {
    match seeder.seed_daily_quotes_with_cancel(shutdown).await {
        Ok(report) if report.cancelled => info!("Seeding run interrupted by shutdown"),
        Ok(report) if report.quota_exhausted => {
            info!("Seeding halted early, daily quota exhausted")
        }
        Ok(_) => {}
        Err(e) => error!("Daily seeding failed: {}", e),
    }
}

/// Resolves once `true` is sent or the sender is gone
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Spawn the midnight seeding loop.
///
/// The loop ends when `shutdown` becomes `true` or its sender is dropped.
/// A run in progress is interrupted by the same signal, including while it
/// backs off between retries.
pub fn spawn_daily_seeding(
    seeder: Arc<DailySeeder>,
    clock: SharedClock,
    run_on_start: bool,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            if run_on_start {
                info!("Running seeding job on startup");
                run_once(&seeder, shutdown.clone()).await;
            }

            loop {
                let wait = until_next_midnight(clock.utc());
                info!("Next seeding run in {}s", wait.as_secs());

                let stop = tokio::select! {
                    _ = tokio::time::sleep(wait) => false,
                    _ = shutdown_requested(&mut shutdown) => true,
                };
                if stop {
                    break;
                }
                run_once(&seeder, shutdown.clone()).await;
            }

            info!("Seeding scheduler stopped");
        }
        .instrument(tracing::info_span!("daily_seeding")),
    )
}
