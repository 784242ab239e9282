//! Maintenance pass over the whole quote table.
//!
//! Rows whose author is still [`UNKNOWN_AUTHOR`] get a second chance at
//! extraction, then duplicates under [`dedup_key`] are removed keeping the
//! lowest id.

use crate::extract::{dedup_key, extract, UNKNOWN_AUTHOR};
use crate::store::{Store, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Outcome of a cleanup pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub scanned: usize,
    pub deleted: u64,
    /// Kept rows whose author was recovered
    pub repaired: usize,
}

#[instrument(skip(store))]
pub async fn cleanup_quotes(store: &Store) -> Result<CleanupReport, CleanupError> {
    let quotes = store.all_quotes().await?;
    let mut report = CleanupReport {
        scanned: quotes.len(),
        ..Default::default()
    };

    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    let mut repairs = Vec::new();

    for quote in quotes {
        let (text, author) = if quote.author == UNKNOWN_AUTHOR {
            let recovered = extract(&quote.quote);
            if recovered.author == UNKNOWN_AUTHOR || recovered.quote.is_empty() {
                (quote.quote.clone(), quote.author.clone())
            } else {
                (recovered.quote, recovered.author)
            }
        } else {
            (quote.quote.clone(), quote.author.clone())
        };

        if !seen.insert(dedup_key(&text, &author)) {
            debug!("Quote {} duplicates an earlier entry", quote.id);
            duplicates.push(quote.id);
            continue;
        }

        if text != quote.quote || author != quote.author {
            repairs.push((quote.id, text, author));
        }
    }

    if !duplicates.is_empty() {
        report.deleted = store.delete_quotes(&duplicates).await?;
        info!("Deleted {} duplicate quotes", report.deleted);
    }

    for (id, text, author) in &repairs {
        store.update_quote_text(*id, text, author).await?;
        debug!("Recovered author for quote {}: {}", id, author);
    }
    report.repaired = repairs.len();

    info!(
        "Cleanup scanned {} quotes: {} deleted, {} repaired",
        report.scanned, report.deleted, report.repaired
    );
    Ok(report)
}
