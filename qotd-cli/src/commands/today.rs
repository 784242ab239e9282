//! `qotd today` command - Print the quote of the day

use anyhow::Result;
use qotd_core::{system_clock, Config, QotdError, QuoteOfDay};

use super::open_store;

pub async fn run(config: Config, json_output: bool) -> Result<()> {
    let store = open_store(&config).await?;
    let resolver = QuoteOfDay::new(store, system_clock());

    let quote = match resolver.get_quote_of_day().await {
        Ok(quote) => quote,
        Err(QotdError::EmptyPool) => {
            println!("No quotes stored yet. Run `qotd seed` first.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&quote)?);
    } else {
        println!("\n  \"{}\"", quote.quote);
        println!("      - {}\n", quote.author);
        println!(
            "  {} · {}",
            quote.category,
            quote.date.format("%Y-%m-%d")
        );
    }

    Ok(())
}
