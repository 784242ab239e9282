//! Shared data models for qotd.
//!
//! This module contains the persisted records, request/response bodies of
//! the HTTP surface, and small status types shared with the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Kind of a quote record. Stored and serialized as its plain string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuoteKind {
    /// Scoped to one UTC calendar day by its `date`
    Daily,
    /// Generated for an explicit API request
    OnDemand,
    Custom(String),
}

impl std::fmt::Display for QuoteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuoteKind::Daily => write!(f, "daily"),
            QuoteKind::OnDemand => write!(f, "on-demand"),
            QuoteKind::Custom(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for QuoteKind {
    fn from(s: &str) -> Self {
        match s {
            "daily" => QuoteKind::Daily,
            "on-demand" => QuoteKind::OnDemand,
            other => QuoteKind::Custom(other.to_string()),
        }
    }
}

impl From<String> for QuoteKind {
    fn from(s: String) -> Self {
        QuoteKind::from(s.as_str())
    }
}

impl From<QuoteKind> for String {
    fn from(kind: QuoteKind) -> Self {
        kind.to_string()
    }
}

/// A named grouping every quote references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// A stored quote joined with its category name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Quote {
    pub id: i64,
    pub uuid: Uuid,
    pub quote: String,
    pub author: String,
    pub category_id: i64,
    /// Category name (read-only, joined)
    pub category: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type", try_from = "String")]
    #[schema(value_type = String, example = "daily")]
    pub kind: QuoteKind,
    pub date: DateTime<Utc>,
}

/// Fields of a quote about to be inserted
#[derive(Debug, Clone)]
pub struct NewQuote {
    pub quote: String,
    pub author: String,
    pub category_id: i64,
    pub kind: QuoteKind,
    pub date: DateTime<Utc>,
}

impl NewQuote {
    /// A daily quote dated `day`
    pub fn daily(
        quote: impl Into<String>,
        author: impl Into<String>,
        category_id: i64,
        day: DateTime<Utc>,
    ) -> Self {
        Self {
            quote: quote.into(),
            author: author.into(),
            category_id,
            kind: QuoteKind::Daily,
            date: day,
        }
    }
}

/// Partial update applied by the manual edit endpoint
#[derive(Debug, Clone, Default)]
pub struct QuoteUpdate {
    pub quote: Option<String>,
    pub author: Option<String>,
    pub category_id: Option<i64>,
    pub kind: Option<QuoteKind>,
    pub date: Option<DateTime<Utc>>,
}

/// Filters for listing quotes
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QuoteFilter {
    /// Category name, case-insensitive exact match
    pub category: Option<String>,
    /// Author, case-insensitive substring match
    pub author: Option<String>,
}

/// Body of `POST /quotes`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateQuoteRequest {
    pub category: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// RFC 3339 timestamp
    #[serde(default)]
    pub date: Option<String>,
}

/// Body of `PUT /quotes/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateQuoteRequest {
    #[serde(default)]
    pub quote: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// RFC 3339 timestamp
    #[serde(default)]
    pub date: Option<String>,
}

/// Generation quota status
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuotaStatus {
    pub requests_today: u32,
    pub requests_per_day_limit: u32,
    pub requests_last_minute: u32,
    pub requests_per_minute_limit: u32,
    pub last_error: Option<String>,
}

/// API error response: `{"error": "..."}`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub categories: usize,
}
