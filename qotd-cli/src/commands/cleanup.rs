//! `qotd cleanup` command - Deduplicate quotes and recover authors

use anyhow::Result;
use qotd_core::{cleanup_quotes, Config};

use super::open_store;

pub async fn run(config: Config, json_output: bool) -> Result<()> {
    let store = open_store(&config).await?;
    let report = cleanup_quotes(&store).await?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("🧹 Cleanup complete");
        println!("   Scanned:  {}", report.scanned);
        println!("   Deleted:  {}", report.deleted);
        println!("   Repaired: {}", report.repaired);
    }

    Ok(())
}
