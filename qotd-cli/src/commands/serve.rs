//! `qotd serve` command - Start the quote server

use anyhow::Result;
use qotd_core::{server, spawn_daily_seeding, system_clock, Config, DailySeeder};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use super::{build_generator, check_api_key, open_store};

pub async fn run(config: Config, no_seed: bool, seed_on_start: bool) -> Result<()> {
    info!("Starting qotd server...");

    check_api_key(&config);

    let clock = system_clock();
    let store = open_store(&config).await?;
    let generator = build_generator(&config, clock.clone())?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = if config.seeding.enabled && !no_seed {
        let seeder = Arc::new(DailySeeder::new(
            store.clone(),
            Arc::clone(&generator),
            clock.clone(),
            config.seeding.clone(),
        ));
        let run_on_start = seed_on_start || config.seeding.run_on_start;
        Some(spawn_daily_seeding(
            seeder,
            clock.clone(),
            run_on_start,
            shutdown_rx,
        ))
    } else {
        info!("Daily seeding disabled");
        None
    };

    let state = Arc::new(server::AppState::new(
        store,
        generator,
        clock,
        config.clone(),
    ));

    println!("🚀 qotd server starting on {}", config.server_url());
    println!("   Quotes:           {}/quotes", config.server_url());
    println!(
        "   Quote of the day: {}/quotes/random/of-the-day",
        config.server_url()
    );
    println!("   OpenAPI:          {}/openapi.json", config.server_url());
    println!("   Press Ctrl+C to stop");

    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutting down");
        let _ = shutdown_tx.send(true);
    };

    server::start_server(state, shutdown).await?;

    if let Some(handle) = scheduler {
        handle.await?;
    }

    Ok(())
}
