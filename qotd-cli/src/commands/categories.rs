//! `qotd categories` command - List categories

use anyhow::Result;
use qotd_core::Config;

use super::open_store;

pub async fn run(config: Config) -> Result<()> {
    let store = open_store(&config).await?;
    let categories = store.list_categories().await?;

    if categories.is_empty() {
        println!("No categories configured.");
        return Ok(());
    }

    println!("{:<4} {:<16} Description", "ID", "Name");
    for category in &categories {
        println!(
            "{:<4} {:<16} {}",
            category.id,
            category.name,
            category.description.as_deref().unwrap_or("")
        );
    }

    Ok(())
}
