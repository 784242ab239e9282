//! CLI command implementations

pub mod categories;
pub mod cleanup;
pub mod config;
pub mod quota;
pub mod seed;
pub mod serve;
pub mod status;
pub mod today;

use anyhow::Result;
use qotd_core::{
    Config, GeminiClient, QuotaTracker, ResilientGenerator, RetryPolicy, SharedClock, Store,
};
use std::sync::Arc;

/// Open the configured database and make sure the configured categories exist
pub async fn open_store(config: &Config) -> Result<Store> {
    let db_path = config
        .db_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine database path"))?;
    let store = Store::open(&db_path).await?;
    store.ensure_categories(&config.categories).await?;
    Ok(store)
}

/// Gemini client wrapped in the quota tracker and retry policy
pub fn build_generator(config: &Config, clock: SharedClock) -> Result<Arc<ResilientGenerator>> {
    let client = GeminiClient::new(&config.gemini)?;
    let quota = QuotaTracker::new(config.quota.clone(), clock);
    Ok(Arc::new(ResilientGenerator::new(
        Arc::new(client),
        Arc::new(quota),
        RetryPolicy::from(&config.retry),
    )))
}

/// Warn early when generation cannot work
pub fn check_api_key(config: &Config) {
    if config.gemini.api_key.is_none() {
        eprintln!("⚠️  Warning: no Gemini API key configured");
        eprintln!("   Set GEMINI_API_KEY or gemini.api_key in the config file.");
    }
}
