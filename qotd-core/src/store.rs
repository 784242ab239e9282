//! SQLite persistence for categories and quotes.
//!
//! Thin CRUD layer: every operation is a single statement (or a read
//! followed by a single write) and no multi-row transactions are used.

use crate::config::CategorySeed;
use crate::model::{Category, NewQuote, Quote, QuoteFilter, QuoteKind, QuoteUpdate};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Errors raised by the store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Failed to initialize database: {0}")]
    InitializationError(String),
}

const SELECT_QUOTES: &str = r#"
    SELECT q.id, q.uuid, q.quote, q.author, q.category_id,
           c.name AS category, q.type, q.date
    FROM quotes q
    JOIN categories c ON c.id = q.category_id
"#;

/// Handle to the quote database
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if needed) the database at the given path
    #[instrument(skip_all)]
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::InitializationError(format!("Failed to create directory: {}", e))
            })?;
        }

        debug!("Connecting to SQLite database at: {}", db_path.display());
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::init_schema(&pool).await?;

        info!("Quote store initialized successfully");

        Ok(Self { pool })
    }

    /// Initialize the database schema
    async fn init_schema(pool: &SqlitePool) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE COLLATE NOCASE,
                description TEXT
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quotes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                uuid BLOB NOT NULL UNIQUE,
                quote TEXT NOT NULL,
                author TEXT NOT NULL,
                category_id INTEGER NOT NULL REFERENCES categories(id),
                type TEXT NOT NULL,
                date TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        // Daily lookups filter on type + category + date range
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_quotes_daily
            ON quotes(type, category_id, date)
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Insert any configured category that does not exist yet
    pub async fn ensure_categories(&self, seeds: &[CategorySeed]) -> Result<u64, StoreError> {
        let mut created = 0;
        for seed in seeds {
            if self.find_category_by_name(&seed.name).await?.is_some() {
                continue;
            }
            let result = sqlx::query(
                "INSERT OR IGNORE INTO categories (name, description) VALUES (?, ?)",
            )
            .bind(&seed.name)
            .bind(&seed.description)
            .execute(&self.pool)
            .await?;
            created += result.rows_affected();
        }
        if created > 0 {
            info!("Created {} categories", created);
        }
        Ok(created)
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, description FROM categories ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    /// Case-insensitive exact lookup by name, Unicode aware
    pub async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>, StoreError> {
        let wanted = name.trim().to_lowercase();
        let category = self
            .list_categories()
            .await?
            .into_iter()
            .find(|category| category.name.to_lowercase() == wanted);
        Ok(category)
    }

    #[instrument(skip(self, new), fields(category_id = new.category_id, kind = %new.kind))]
    pub async fn insert_quote(&self, new: NewQuote) -> Result<Quote, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO quotes (uuid, quote, author, category_id, type, date)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.quote)
        .bind(&new.author)
        .bind(new.category_id)
        .bind(new.kind.to_string())
        .bind(new.date)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!("Inserted quote with id: {}", id);

        self.get_quote(id)
            .await?
            .ok_or(StoreError::DatabaseError(sqlx::Error::RowNotFound))
    }

    /// List quotes, optionally filtered by category name and author substring.
    ///
    /// Both filters ignore case across the full Unicode range.
    pub async fn list_quotes(&self, filter: &QuoteFilter) -> Result<Vec<Quote>, StoreError> {
        let category_id = match filter.category.as_deref() {
            Some(name) => match self.find_category_by_name(name).await? {
                Some(category) => Some(category.id),
                None => return Ok(Vec::new()),
            },
            None => None,
        };

        let sql = format!(
            r#"{SELECT_QUOTES}
            WHERE (?1 IS NULL OR q.category_id = ?1)
            ORDER BY q.id
            "#
        );
        let mut quotes = sqlx::query_as::<_, Quote>(&sql)
            .bind(category_id)
            .fetch_all(&self.pool)
            .await?;

        if let Some(author) = filter.author.as_deref() {
            let needle = author.to_lowercase();
            quotes.retain(|quote| quote.author.to_lowercase().contains(&needle));
        }
        Ok(quotes)
    }

    pub async fn all_quotes(&self) -> Result<Vec<Quote>, StoreError> {
        self.list_quotes(&QuoteFilter::default()).await
    }

    pub async fn get_quote(&self, id: i64) -> Result<Option<Quote>, StoreError> {
        let sql = format!("{SELECT_QUOTES} WHERE q.id = ?");
        let quote = sqlx::query_as::<_, Quote>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(quote)
    }

    pub async fn get_quote_by_uuid(&self, uuid: Uuid) -> Result<Option<Quote>, StoreError> {
        let sql = format!("{SELECT_QUOTES} WHERE q.uuid = ?");
        let quote = sqlx::query_as::<_, Quote>(&sql)
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(quote)
    }

    /// Apply a partial update; `None` if the quote does not exist
    pub async fn update_quote(
        &self,
        id: i64,
        update: QuoteUpdate,
    ) -> Result<Option<Quote>, StoreError> {
        let Some(existing) = self.get_quote(id).await? else {
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE quotes
            SET quote = ?, author = ?, category_id = ?, type = ?, date = ?
            WHERE id = ?
            "#,
        )
        .bind(update.quote.unwrap_or(existing.quote))
        .bind(update.author.unwrap_or(existing.author))
        .bind(update.category_id.unwrap_or(existing.category_id))
        .bind(update.kind.unwrap_or(existing.kind).to_string())
        .bind(update.date.unwrap_or(existing.date))
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_quote(id).await
    }

    /// Overwrite text and author only (used by the cleanup pass)
    pub async fn update_quote_text(
        &self,
        id: i64,
        quote: &str,
        author: &str,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE quotes SET quote = ?, author = ? WHERE id = ?")
            .bind(quote)
            .bind(author)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete a quote, returning the deleted record
    pub async fn delete_quote(&self, id: i64) -> Result<Option<Quote>, StoreError> {
        let Some(existing) = self.get_quote(id).await? else {
            return Ok(None);
        };

        let result = sqlx::query("DELETE FROM quotes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok((result.rows_affected() > 0).then_some(existing))
    }

    pub async fn delete_quotes(&self, ids: &[i64]) -> Result<u64, StoreError> {
        let mut deleted = 0;
        for id in ids {
            let result = sqlx::query("DELETE FROM quotes WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await?;
            deleted += result.rows_affected();
        }
        Ok(deleted)
    }

    /// Number of daily quotes of a category dated within `[from, to)`
    pub async fn count_daily_quotes(
        &self,
        category_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u32, StoreError> {
        let result: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM quotes
            WHERE type = ? AND category_id = ? AND date >= ? AND date < ?
            "#,
        )
        .bind(QuoteKind::Daily.to_string())
        .bind(category_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(result.0 as u32)
    }

    /// Texts of the daily quotes of a category dated within `[from, to)`
    pub async fn daily_quote_texts(
        &self,
        category_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT quote FROM quotes
            WHERE type = ? AND category_id = ? AND date >= ? AND date < ?
            ORDER BY id
            "#,
        )
        .bind(QuoteKind::Daily.to_string())
        .bind(category_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(quote,)| quote).collect())
    }

    /// Lowest-id daily quote of any category dated within `[from, to)`
    pub async fn first_daily_quote(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Option<Quote>, StoreError> {
        let sql = format!(
            "{SELECT_QUOTES} WHERE q.type = ? AND q.date >= ? AND q.date < ? ORDER BY q.id LIMIT 1"
        );
        let quote = sqlx::query_as::<_, Quote>(&sql)
            .bind(QuoteKind::Daily.to_string())
            .bind(from)
            .bind(to)
            .fetch_optional(&self.pool)
            .await?;
        Ok(quote)
    }

    /// Every quote, ordered by its uuid
    pub async fn quotes_ordered_by_uuid(&self) -> Result<Vec<Quote>, StoreError> {
        let sql = format!("{SELECT_QUOTES} ORDER BY q.uuid");
        let quotes = sqlx::query_as::<_, Quote>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(quotes)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::test_store;
    use super::*;
    use chrono::Duration;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn on_demand(quote: &str, author: &str, category_id: i64) -> NewQuote {
        NewQuote {
            quote: quote.to_string(),
            author: author.to_string(),
            category_id,
            kind: QuoteKind::OnDemand,
            date: ts("2024-06-01T12:30:00Z"),
        }
    }

    #[tokio::test]
    async fn test_ensure_categories_is_idempotent() {
        let t = test_store(&["Wisdom", "Life"]).await;
        let again = t
            .store
            .ensure_categories(&[CategorySeed::new("wisdom", "dup")])
            .await
            .unwrap();
        assert_eq!(again, 0);

        let names: Vec<String> = t
            .store
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Wisdom", "Life"]);
    }

    #[tokio::test]
    async fn test_find_category_case_insensitive() {
        let t = test_store(&["Wisdom"]).await;
        let found = t.store.find_category_by_name("wISDOM").await.unwrap();
        assert_eq!(found.map(|c| c.name).as_deref(), Some("Wisdom"));
        assert!(t.store.find_category_by_name("Wis").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_category_matching_folds_non_ascii_case() {
        let t = test_store(&["Éthique", "Ästhetik"]).await;

        let found = t.store.find_category_by_name(" éTHIQUE ").await.unwrap();
        assert_eq!(found.map(|c| c.name).as_deref(), Some("Éthique"));

        let created = t
            .store
            .ensure_categories(&[CategorySeed {
                name: "ästhetik".to_string(),
                description: None,
            }])
            .await
            .unwrap();
        assert_eq!(created, 0);
        assert_eq!(t.store.list_categories().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_list_filters_fold_non_ascii_case() {
        let t = test_store(&["Éthique", "Humor"]).await;
        t.store
            .insert_quote(on_demand("Rien n'est plus dangereux qu'une idée", "Émile Chartier", 1))
            .await
            .unwrap();
        t.store
            .insert_quote(on_demand("Time flies like an arrow", "Groucho Marx", 2))
            .await
            .unwrap();

        let by_category = t
            .store
            .list_quotes(&QuoteFilter {
                category: Some("ÉTHIQUE".to_string()),
                author: None,
            })
            .await
            .unwrap();
        assert_eq!(by_category.len(), 1);
        assert_eq!(by_category[0].author, "Émile Chartier");

        let by_author = t
            .store
            .list_quotes(&QuoteFilter {
                category: None,
                author: Some("émile".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(by_author.len(), 1);
        assert_eq!(by_author[0].category, "Éthique");
    }

    #[tokio::test]
    async fn test_insert_and_fetch() {
        let t = test_store(&["Wisdom"]).await;
        let inserted = t
            .store
            .insert_quote(on_demand("Knowledge is power", "Francis Bacon", 1))
            .await
            .unwrap();

        assert_eq!(inserted.category, "Wisdom");
        assert_eq!(inserted.kind, QuoteKind::OnDemand);
        assert_eq!(inserted.date, ts("2024-06-01T12:30:00Z"));

        let by_id = t.store.get_quote(inserted.id).await.unwrap().unwrap();
        let by_uuid = t.store.get_quote_by_uuid(inserted.uuid).await.unwrap().unwrap();
        assert_eq!(by_id, inserted);
        assert_eq!(by_uuid, inserted);
        assert!(t.store.get_quote(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_foreign_key_enforced() {
        let t = test_store(&["Wisdom"]).await;
        let result = t.store.insert_quote(on_demand("Orphan", "Nobody", 42)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_list_filters() {
        let t = test_store(&["Wisdom", "Humor"]).await;
        t.store
            .insert_quote(on_demand("Knowledge is power", "Francis Bacon", 1))
            .await
            .unwrap();
        t.store
            .insert_quote(on_demand("I think therefore I am", "René Descartes", 1))
            .await
            .unwrap();
        t.store
            .insert_quote(on_demand("Time flies like an arrow", "Groucho Marx", 2))
            .await
            .unwrap();

        let all = t.store.all_quotes().await.unwrap();
        assert_eq!(all.len(), 3);

        let wisdom = t
            .store
            .list_quotes(&QuoteFilter {
                category: Some("wisdom".to_string()),
                author: None,
            })
            .await
            .unwrap();
        assert_eq!(wisdom.len(), 2);

        let bacon = t
            .store
            .list_quotes(&QuoteFilter {
                category: None,
                author: Some("BACON".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(bacon.len(), 1);
        assert_eq!(bacon[0].author, "Francis Bacon");

        let both = t
            .store
            .list_quotes(&QuoteFilter {
                category: Some("Humor".to_string()),
                author: Some("bacon".to_string()),
            })
            .await
            .unwrap();
        assert!(both.is_empty());

        let unknown = t
            .store
            .list_quotes(&QuoteFilter {
                category: Some("Nope".to_string()),
                author: None,
            })
            .await
            .unwrap();
        assert!(unknown.is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let t = test_store(&["Wisdom", "Humor"]).await;
        let q = t
            .store
            .insert_quote(on_demand("Knowledge is power", "Unknown", 1))
            .await
            .unwrap();

        let updated = t
            .store
            .update_quote(
                q.id,
                QuoteUpdate {
                    author: Some("Francis Bacon".to_string()),
                    category_id: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.author, "Francis Bacon");
        assert_eq!(updated.category, "Humor");
        assert_eq!(updated.quote, "Knowledge is power");
        assert_eq!(updated.uuid, q.uuid);

        assert!(t
            .store
            .update_quote(999, QuoteUpdate::default())
            .await
            .unwrap()
            .is_none());

        let deleted = t.store.delete_quote(q.id).await.unwrap().unwrap();
        assert_eq!(deleted.id, q.id);
        assert!(t.store.delete_quote(q.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_daily_range_queries() {
        let t = test_store(&["Wisdom", "Life"]).await;
        let today = ts("2024-06-01T00:00:00Z");
        let tomorrow = today + Duration::days(1);

        t.store
            .insert_quote(NewQuote::daily("Yesterday's", "A", 1, today - Duration::days(1)))
            .await
            .unwrap();
        let first = t
            .store
            .insert_quote(NewQuote::daily("Today one", "B", 1, today))
            .await
            .unwrap();
        t.store
            .insert_quote(NewQuote::daily("Today two", "C", 1, today))
            .await
            .unwrap();
        t.store
            .insert_quote(NewQuote::daily("Other category", "D", 2, today))
            .await
            .unwrap();
        t.store
            .insert_quote(NewQuote::daily("Tomorrow's", "E", 1, tomorrow))
            .await
            .unwrap();
        t.store
            .insert_quote(on_demand("Not daily", "F", 1))
            .await
            .unwrap();

        assert_eq!(t.store.count_daily_quotes(1, today, tomorrow).await.unwrap(), 2);
        assert_eq!(
            t.store.daily_quote_texts(1, today, tomorrow).await.unwrap(),
            vec!["Today one", "Today two"]
        );
        let first_daily = t.store.first_daily_quote(today, tomorrow).await.unwrap();
        assert_eq!(first_daily.map(|q| q.id), Some(first.id));
    }
}
