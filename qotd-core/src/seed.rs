//! Daily seeding job.
//!
//! Tops every category up to `per_category` daily quotes for the current UTC
//! day. Running it twice on the same day only fills gaps left by the first
//! run, so it is safe to trigger on startup and again at midnight.

use crate::clean::clean;
use crate::clock::{day_bounds, Clock, SharedClock};
use crate::config::SeedingConfig;
use crate::extract::extract;
use crate::model::{Category, NewQuote};
use crate::retry::{GenerationError, ResilientGenerator};
use crate::store::{Store, StoreError};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

const PHRASINGS: &[&str] = &[
    "Give me a daily quote in the category {category}.",
    "Share one well-known quote about {category}.",
    "Suggest an inspiring quote on the theme of {category}.",
    "What is a memorable quote about {category}?",
];

const FORMAT_INSTRUCTION: &str = "Respond ONLY with the quote and the attributed author, e.g.:\n\"Quote text here.\" - Author Name";

/// Errors that abort a seeding run
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Outcome of one seeding run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedReport {
    pub inserted: u32,
    pub duplicates: u32,
    pub failures: u32,
    /// Categories already holding their full daily set
    pub skipped_categories: u32,
    pub quota_exhausted: bool,
    /// The run was stopped by a shutdown signal
    pub cancelled: bool,
}

/// Build a generation prompt for `category`, asking to avoid `used` quotes
pub fn build_prompt(category: &str, used: &[String]) -> String {
    let phrasing = PHRASINGS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(PHRASINGS[0]);

    let mut prompt = phrasing.replace("{category}", category);
    prompt.push('\n');
    prompt.push_str(FORMAT_INSTRUCTION);

    if !used.is_empty() {
        prompt.push_str("\nDo not repeat any of these quotes:");
        for quote in used {
            prompt.push_str("\n- ");
            prompt.push_str(quote);
        }
    }
    prompt
}

/// What happened to one category
enum CategoryOutcome {
    Done,
    QuotaExhausted,
    Cancelled,
}

/// Orchestrates generation, parsing and insertion of daily quotes
pub struct DailySeeder {
    store: Store,
    generator: Arc<ResilientGenerator>,
    clock: SharedClock,
    config: SeedingConfig,
}

impl DailySeeder {
    pub fn new(
        store: Store,
        generator: Arc<ResilientGenerator>,
        clock: SharedClock,
        config: SeedingConfig,
    ) -> Self {
        Self {
            store,
            generator,
            clock,
            config,
        }
    }

    /// Fill today's daily quotes for every category
    pub async fn seed_daily_quotes(&self) -> Result<SeedReport, SeedError> {
        let (_tx, rx) = watch::channel(false);
        self.seed_daily_quotes_with_cancel(rx).await
    }

    /// Like [`seed_daily_quotes`](Self::seed_daily_quotes), stopping early once `cancel` becomes `true`
    #[instrument(skip(self, cancel))]
    pub async fn seed_daily_quotes_with_cancel(
        &self,
        cancel: watch::Receiver<bool>,
    ) -> Result<SeedReport, SeedError> {
        let (today, tomorrow) = day_bounds(self.clock.utc());
        info!("Seeding daily quotes for {}", today.date_naive());

        let mut report = SeedReport::default();
        for category in self.store.list_categories().await? {
            if *cancel.borrow() {
                info!("Seeding run cancelled");
                report.cancelled = true;
                break;
            }
            if self.generator.quota().daily_exhausted().await {
                warn!("Daily generation quota reached, stopping seeding run");
                report.quota_exhausted = true;
                break;
            }

            let outcome = self
                .seed_category(&category, today, tomorrow, &cancel, &mut report)
                .await?;
            match outcome {
                CategoryOutcome::Done => {}
                CategoryOutcome::QuotaExhausted => {
                    report.quota_exhausted = true;
                    break;
                }
                CategoryOutcome::Cancelled => {
                    info!("Seeding run cancelled");
                    report.cancelled = true;
                    break;
                }
            }
        }

        info!(
            "Seeding finished: {} inserted, {} duplicates, {} failures, {} categories already full",
            report.inserted, report.duplicates, report.failures, report.skipped_categories
        );
        Ok(report)
    }

    async fn seed_category(
        &self,
        category: &Category,
        today: DateTime<Utc>,
        tomorrow: DateTime<Utc>,
        cancel: &watch::Receiver<bool>,
        report: &mut SeedReport,
    ) -> Result<CategoryOutcome, SeedError> {
        let target = self.config.per_category;
        let mut count = self
            .store
            .count_daily_quotes(category.id, today, tomorrow)
            .await?;
        if count >= target {
            debug!("{} already has {} daily quotes", category.name, count);
            report.skipped_categories += 1;
            return Ok(CategoryOutcome::Done);
        }

        let mut used = self
            .store
            .daily_quote_texts(category.id, today, tomorrow)
            .await?;
        let mut attempts = 0;

        while count < target && attempts < self.config.max_attempts_per_category {
            attempts += 1;

            let prompt = build_prompt(&category.name, &used);
            let raw = match self.generator.call_with_cancel(&prompt, cancel.clone()).await {
                Ok(raw) => raw,
                Err(GenerationError::QuotaExhausted(e)) => {
                    warn!("Stopping seeding for today: {}", e);
                    return Ok(CategoryOutcome::QuotaExhausted);
                }
                Err(GenerationError::Cancelled) => return Ok(CategoryOutcome::Cancelled),
                Err(e) => {
                    error!("Failed to fetch quote for category {}: {}", category.name, e);
                    report.failures += 1;
                    return Ok(CategoryOutcome::Done);
                }
            };

            let parsed = extract(&clean(&raw));
            if parsed.quote.is_empty() || used.contains(&parsed.quote) {
                debug!("Skipping duplicate or empty quote for {}", category.name);
                report.duplicates += 1;
                continue;
            }

            let new = NewQuote::daily(&parsed.quote, &parsed.author, category.id, today);
            match self.store.insert_quote(new).await {
                Ok(inserted) => {
                    info!(
                        "Generated daily quote for {}: \"{}\" - {}",
                        category.name, inserted.quote, inserted.author
                    );
                    used.push(parsed.quote);
                    count += 1;
                    report.inserted += 1;
                }
                Err(e) => {
                    error!("Failed to insert quote for category {}: {}", category.name, e);
                    report.failures += 1;
                }
            }
        }

        if count < target {
            warn!(
                "{} has {}/{} daily quotes after {} attempts",
                category.name, count, target, attempts
            );
        }
        Ok(CategoryOutcome::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::FixedClock;
    use crate::config::QuotaConfig;
    use crate::gemini::{GeminiError, TextGenerator};
    use crate::model::QuoteFilter;
    use crate::quota::QuotaTracker;
    use crate::retry::RetryPolicy;
    use crate::store::testing::{test_store, TestStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Always answers with the same text
    struct ConstantGenerator(&'static str, AtomicU32);

    #[async_trait]
    impl TextGenerator for ConstantGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GeminiError> {
            self.1.fetch_add(1, Ordering::SeqCst);
            Ok(self.0.to_string())
        }
    }

    /// Answers with a fresh quote every call
    struct CountingGenerator(AtomicU32);

    #[async_trait]
    impl TextGenerator for CountingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GeminiError> {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            Ok(format!("Here's a quote:\n\"Saying number {n}.\" - Author {n}"))
        }
    }

    struct FailingGenerator(AtomicU32);

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GeminiError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(GeminiError::Authentication {
                status: 403,
                message: "denied".to_string(),
            })
        }
    }

    const NOW: &str = "2024-06-01T09:15:00Z";

    fn seeder(
        t: &TestStore,
        inner: Arc<dyn TextGenerator>,
        per_day: u32,
        clock: Arc<FixedClock>,
    ) -> DailySeeder {
        let quota = QuotaTracker::new(
            QuotaConfig {
                per_minute: 1000,
                per_day,
                min_interval_ms: 0,
            },
            clock.clone(),
        );
        let policy = RetryPolicy {
            max_retries: 1,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
        };
        let generator = ResilientGenerator::new(inner, Arc::new(quota), policy);
        DailySeeder::new(
            t.store.clone(),
            Arc::new(generator),
            clock,
            SeedingConfig::default(),
        )
    }

    async fn daily_quotes(t: &TestStore, category: &str) -> Vec<crate::model::Quote> {
        t.store
            .list_quotes(&QuoteFilter {
                category: Some(category.to_string()),
                author: None,
            })
            .await
            .unwrap()
    }

    #[test]
    fn test_prompt_mentions_category_and_exclusions() {
        let prompt = build_prompt("Wisdom", &["Knowledge is power".to_string()]);
        assert!(prompt.contains("Wisdom"));
        assert!(prompt.contains("Respond ONLY with the quote"));
        assert!(prompt.contains("Do not repeat any of these quotes:\n- Knowledge is power"));

        let fresh = build_prompt("Life", &[]);
        assert!(!fresh.contains("Do not repeat"));
    }

    #[tokio::test]
    async fn test_duplicate_responses_insert_once() {
        let t = test_store(&["Wisdom"]).await;
        let inner = Arc::new(ConstantGenerator(
            "\"Knowledge is power.\" - Francis Bacon",
            AtomicU32::new(0),
        ));
        let job = seeder(&t, inner.clone(), 1000, FixedClock::at(NOW));

        let report = job.seed_daily_quotes().await.unwrap();

        let quotes = daily_quotes(&t, "Wisdom").await;
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].author, "Francis Bacon");
        assert_eq!(quotes[0].quote, "Knowledge is power");
        assert_eq!(quotes[0].date.to_rfc3339(), "2024-06-01T00:00:00+00:00");
        assert_eq!(report.inserted, 1);
        assert_eq!(report.duplicates, 19);
        assert_eq!(inner.1.load(Ordering::SeqCst), 20);
    }

    #[tokio::test]
    async fn test_fills_each_category_to_target_and_is_idempotent() {
        let t = test_store(&["Wisdom", "Life"]).await;
        let clock = FixedClock::at(NOW);
        let inner = Arc::new(CountingGenerator(AtomicU32::new(0)));
        let job = seeder(&t, inner.clone(), 1000, clock.clone());

        let first = job.seed_daily_quotes().await.unwrap();
        assert_eq!(first.inserted, 10);
        assert_eq!(daily_quotes(&t, "Wisdom").await.len(), 5);
        assert_eq!(daily_quotes(&t, "Life").await.len(), 5);

        let second = job.seed_daily_quotes().await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped_categories, 2);
        assert_eq!(inner.0.load(Ordering::SeqCst), 10);

        clock.advance_days(1);
        let next_day = job.seed_daily_quotes().await.unwrap();
        assert_eq!(next_day.inserted, 10);
    }

    #[tokio::test]
    async fn test_stops_at_daily_quota() {
        let t = test_store(&["Wisdom", "Life"]).await;
        let inner = Arc::new(CountingGenerator(AtomicU32::new(0)));
        let job = seeder(&t, inner.clone(), 3, FixedClock::at(NOW));

        let report = job.seed_daily_quotes().await.unwrap();

        assert!(report.quota_exhausted);
        assert_eq!(report.inserted, 3);
        assert_eq!(inner.0.load(Ordering::SeqCst), 3);
        assert_eq!(daily_quotes(&t, "Wisdom").await.len(), 3);
        assert!(daily_quotes(&t, "Life").await.is_empty());
    }

    #[tokio::test]
    async fn test_generation_failure_moves_to_next_category() {
        let t = test_store(&["Wisdom", "Life"]).await;
        let inner = Arc::new(FailingGenerator(AtomicU32::new(0)));
        let job = seeder(&t, inner.clone(), 1000, FixedClock::at(NOW));

        let report = job.seed_daily_quotes().await.unwrap();

        assert_eq!(report.failures, 2);
        assert_eq!(report.inserted, 0);
        assert!(!report.quota_exhausted);
        assert_eq!(inner.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancelled_run_generates_nothing() {
        let t = test_store(&["Wisdom", "Life"]).await;
        let inner = Arc::new(CountingGenerator(AtomicU32::new(0)));
        let job = seeder(&t, inner.clone(), 1000, FixedClock::at(NOW));
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let report = job.seed_daily_quotes_with_cancel(rx).await.unwrap();

        assert!(report.cancelled);
        assert_eq!(report.inserted, 0);
        assert_eq!(inner.0.load(Ordering::SeqCst), 0);
        assert!(t.store.all_quotes().await.unwrap().is_empty());
    }
}
