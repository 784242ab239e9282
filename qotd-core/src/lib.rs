//! # qotd Core
//!
//! Core library for qotd - a quote-of-the-day backend on top of Gemini.
//!
//! This crate provides:
//! - Configuration management
//! - Gemini REST client behind the `TextGenerator` trait
//! - Quota tracking and retrying generation
//! - Output cleaning and quote/author extraction
//! - SQLite quote store
//! - Daily seeding job, its midnight scheduler, and the cleanup pass
//! - Quote-of-the-day resolution
//! - HTTP API server
//! - Shared data models

pub mod clean;
pub mod cleanup;
pub mod clock;
pub mod config;
pub mod extract;
pub mod gemini;
pub mod model;
pub mod qotd;
pub mod quota;
pub mod retry;
pub mod scheduler;
pub mod seed;
pub mod server;
pub mod store;

pub use clean::clean;
pub use cleanup::{cleanup_quotes, CleanupError, CleanupReport};
pub use clock::{system_clock, SharedClock};
pub use config::{CategorySeed, Config, QuotaConfig, RetryConfig, SeedingConfig};
pub use extract::{dedup_key, extract, ExtractedQuote, UNKNOWN_AUTHOR};
pub use gemini::{GeminiClient, GeminiError, TextGenerator};
pub use model::*;
pub use qotd::{QotdError, QuoteOfDay};
pub use quota::{QuotaError, QuotaTracker, UsageStats};
pub use retry::{GenerationError, ResilientGenerator, RetryPolicy};
pub use scheduler::spawn_daily_seeding;
pub use seed::{DailySeeder, SeedError, SeedReport};
pub use store::{Store, StoreError};
