//! Quote-of-the-day resolution.
//!
//! The first call on a UTC day promotes one quote from the pool to a daily
//! record; every later call that day returns that record. Selection is
//! deterministic: the pool is ordered by uuid and indexed by the day number.

use crate::clock::{day_bounds, day_number, Clock, SharedClock};
use crate::model::{NewQuote, Quote};
use crate::store::{Store, StoreError};
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Error)]
pub enum QotdError {
    #[error("No quotes available to pick a quote of the day from")]
    EmptyPool,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub struct QuoteOfDay {
    store: Store,
    clock: SharedClock,
}

impl QuoteOfDay {
    pub fn new(store: Store, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    /// Today's quote, promoting one if none exists yet
    #[instrument(skip(self))]
    pub async fn get_quote_of_day(&self) -> Result<Quote, QotdError> {
        let (today, tomorrow) = day_bounds(self.clock.utc());

        if let Some(existing) = self.store.first_daily_quote(today, tomorrow).await? {
            debug!("Reusing quote of the day {}", existing.id);
            return Ok(existing);
        }

        let pool = self.store.quotes_ordered_by_uuid().await?;
        if pool.is_empty() {
            return Err(QotdError::EmptyPool);
        }

        let index = day_number(today).rem_euclid(pool.len() as i64) as usize;
        let picked = &pool[index];

        let promoted = self
            .store
            .insert_quote(NewQuote::daily(
                &picked.quote,
                &picked.author,
                picked.category_id,
                today,
            ))
            .await?;

        info!(
            "Promoted quote {} to quote of the day for {}",
            picked.id,
            today.date_naive()
        );
        Ok(promoted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::FixedClock;
    use crate::model::QuoteKind;
    use crate::store::testing::test_store;
    use chrono::{DateTime, Utc};

    fn on_demand(quote: &str, category_id: i64) -> NewQuote {
        NewQuote {
            quote: quote.to_string(),
            author: "Someone".to_string(),
            category_id,
            kind: QuoteKind::OnDemand,
            date: DateTime::parse_from_rfc3339("2024-01-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    #[tokio::test]
    async fn test_empty_pool() {
        let t = test_store(&["Wisdom"]).await;
        let resolver = QuoteOfDay::new(t.store.clone(), FixedClock::at("2024-06-01T12:00:00Z"));
        assert!(matches!(
            resolver.get_quote_of_day().await,
            Err(QotdError::EmptyPool)
        ));
    }

    #[tokio::test]
    async fn test_same_day_returns_same_record() {
        let t = test_store(&["Wisdom"]).await;
        for text in ["One", "Two", "Three"] {
            t.store.insert_quote(on_demand(text, 1)).await.unwrap();
        }
        let clock = FixedClock::at("2024-06-01T08:00:00Z");
        let resolver = QuoteOfDay::new(t.store.clone(), clock.clone());

        let first = resolver.get_quote_of_day().await.unwrap();
        let second = resolver.get_quote_of_day().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.kind, QuoteKind::Daily);
        assert_eq!(first.date.to_rfc3339(), "2024-06-01T00:00:00+00:00");
        assert_eq!(t.store.all_quotes().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_selection_is_deterministic_by_uuid_and_day() {
        let t = test_store(&["Wisdom"]).await;
        for text in ["One", "Two", "Three"] {
            t.store.insert_quote(on_demand(text, 1)).await.unwrap();
        }
        let pool = t.store.quotes_ordered_by_uuid().await.unwrap();
        let clock = FixedClock::at("2024-06-01T08:00:00Z");
        let (today, _) = day_bounds(clock.utc());
        let expected = &pool[(day_number(today) % 3) as usize];

        let resolver = QuoteOfDay::new(t.store.clone(), clock);
        let picked = resolver.get_quote_of_day().await.unwrap();

        assert_eq!(picked.quote, expected.quote);
        assert_eq!(picked.category_id, expected.category_id);
        assert_ne!(picked.uuid, expected.uuid);
    }

    #[tokio::test]
    async fn test_new_day_promotes_again() {
        let t = test_store(&["Wisdom"]).await;
        t.store.insert_quote(on_demand("Only one", 1)).await.unwrap();
        let clock = FixedClock::at("2024-06-01T23:59:00Z");
        let resolver = QuoteOfDay::new(t.store.clone(), clock.clone());

        let first = resolver.get_quote_of_day().await.unwrap();
        clock.advance_days(1);
        let second = resolver.get_quote_of_day().await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(second.date.to_rfc3339(), "2024-06-02T00:00:00+00:00");
    }
}
