//! `qotd seed` command - Run the daily seeding job once

use anyhow::Result;
use qotd_core::{system_clock, Config, DailySeeder};
use tokio::sync::watch;
use tracing::info;

use super::{build_generator, check_api_key, open_store};

pub async fn run(config: Config, json_output: bool) -> Result<()> {
    check_api_key(&config);

    let clock = system_clock();
    let store = open_store(&config).await?;
    let generator = build_generator(&config, clock.clone())?;
    let seeder = DailySeeder::new(store, generator, clock, config.seeding.clone());

    info!("Seeding daily quotes...");
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping seeding");
            let _ = cancel_tx.send(true);
        }
    });
    let report = seeder.seed_daily_quotes_with_cancel(cancel_rx).await?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("🌱 Seeding finished");
    println!("   Inserted:           {}", report.inserted);
    println!("   Duplicates skipped: {}", report.duplicates);
    println!("   Failures:           {}", report.failures);
    println!("   Categories full:    {}", report.skipped_categories);
    if report.quota_exhausted {
        println!("\n⚠️  Daily generation quota reached, some categories were not filled.");
    }
    if report.cancelled {
        println!("\n⚠️  Seeding was interrupted before finishing.");
    }

    Ok(())
}
