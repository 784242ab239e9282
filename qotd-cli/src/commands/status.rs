//! `qotd status` command - Check server status

use anyhow::Result;
use qotd_core::{Config, HealthResponse, QuotaStatus};

pub async fn run(config: Config) -> Result<()> {
    let url = format!("{}/health", config.server_url());

    println!("Checking qotd server status...");
    println!("URL: {}", url);

    let response = match reqwest::get(&url).await {
        Ok(response) => response,
        Err(_) => {
            println!("\n❌ qotd server is not running");
            println!("   Start it with: qotd serve");
            return Ok(());
        }
    };

    if !response.status().is_success() {
        println!(
            "\n⚠️  qotd server responded with status: {}",
            response.status()
        );
        return Ok(());
    }

    let health: HealthResponse = response.json().await?;
    println!("\n✅ qotd server is running");
    println!("   Status:     {}", health.status);
    println!("   Version:    {}", health.version);
    println!("   Categories: {}", health.categories);

    let quota_url = format!("{}/quota", config.server_url());
    if let Ok(quota_response) = reqwest::get(&quota_url).await {
        if let Ok(quota) = quota_response.json::<QuotaStatus>().await {
            println!("\n📊 Quota:");
            println!(
                "   Today:    {}/{}",
                quota.requests_today, quota.requests_per_day_limit
            );
            println!(
                "   Minute:   {}/{}",
                quota.requests_last_minute, quota.requests_per_minute_limit
            );
        }
    }

    Ok(())
}
