//! Configuration management for qotd.
//!
//! Configuration is loaded in order of precedence:
//! 1. Defaults
//! 2. Config file (~/.qotd/config.toml)
//! 3. Environment variables
//! 4. CLI flags (handled at CLI layer)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Gemini API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key; usually supplied through `GEMINI_API_KEY` rather than the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model used for generation
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the generative language REST API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path (default: ~/.qotd/qotd.db)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Generation quota configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Maximum generation calls per minute
    #[serde(default = "default_per_minute")]
    pub per_minute: u32,

    /// Maximum generation calls per UTC day
    #[serde(default = "default_per_day")]
    pub per_day: u32,

    /// Minimum spacing between two calls, in milliseconds
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
}

fn default_per_minute() -> u32 {
    15
}

fn default_per_day() -> u32 {
    200
}

fn default_min_interval_ms() -> u64 {
    1000
}

impl QuotaConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            per_minute: default_per_minute(),
            per_day: default_per_day(),
            min_interval_ms: default_min_interval_ms(),
        }
    }
}

/// Retry configuration for transient upstream failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff delay in milliseconds; doubles per retry
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for a single backoff delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    4
}

fn default_base_delay_ms() -> u64 {
    2000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Daily seeding job configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedingConfig {
    /// Run the job from the server at every UTC midnight
    #[serde(default = "default_schedule_enabled")]
    pub enabled: bool,

    /// Also run once when the server starts
    #[serde(default)]
    pub run_on_start: bool,

    /// Daily quotes wanted per category per day
    #[serde(default = "default_per_category")]
    pub per_category: u32,

    /// Generation attempts allowed per category per run
    #[serde(default = "default_max_attempts")]
    pub max_attempts_per_category: u32,
}

fn default_schedule_enabled() -> bool {
    true
}

fn default_per_category() -> u32 {
    5
}

fn default_max_attempts() -> u32 {
    20
}

impl Default for SeedingConfig {
    fn default() -> Self {
        Self {
            enabled: default_schedule_enabled(),
            run_on_start: false,
            per_category: default_per_category(),
            max_attempts_per_category: default_max_attempts(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// A category created at startup if missing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySeed {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CategorySeed {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
        }
    }
}

fn default_categories() -> Vec<CategorySeed> {
    vec![
        CategorySeed::new("Wisdom", "Timeless insight and reflection"),
        CategorySeed::new("Motivation", "Drive, persistence and ambition"),
        CategorySeed::new("Love", "Affection, friendship and connection"),
        CategorySeed::new("Life", "Observations on living well"),
        CategorySeed::new("Success", "Achievement and effort"),
        CategorySeed::new("Humor", "Wit and light-heartedness"),
    ]
}

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub quota: QuotaConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub seeding: SeedingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default = "default_categories")]
    pub categories: Vec<CategorySeed>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            quota: QuotaConfig::default(),
            retry: RetryConfig::default(),
            seeding: SeedingConfig::default(),
            logging: LoggingConfig::default(),
            categories: default_categories(),
        }
    }
}

impl Config {
    /// Returns the default qotd directory (~/.qotd)
    pub fn qotd_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".qotd"))
    }

    /// Returns the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        Self::qotd_dir().map(|d| d.join("config.toml"))
    }

    /// Returns the default database path
    pub fn default_db_path() -> Option<PathBuf> {
        Self::qotd_dir().map(|d| d.join("qotd.db"))
    }

    /// Database path from config, falling back to the default location
    pub fn db_path(&self) -> Option<PathBuf> {
        self.database.path.clone().or_else(Self::default_db_path)
    }

    /// Load configuration from the default path with environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::default_config_path() {
            Some(path) if path.exists() => Self::load_from_file(&path)?,
            _ => Config::default(),
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            if !key.trim().is_empty() {
                self.gemini.api_key = Some(key);
            }
        }

        if let Ok(model) = std::env::var("QOTD_MODEL") {
            self.gemini.model = model;
        }

        if let Ok(port) = std::env::var("QOTD_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }

        if let Ok(host) = std::env::var("QOTD_HOST") {
            self.server.host = host;
        }

        if let Ok(path) = std::env::var("QOTD_DB_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }

        if let Ok(level) = std::env::var("QOTD_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Reject settings the quota and seeding logic cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quota.per_minute == 0 {
            return Err(ConfigError::ValidationError(
                "quota.per_minute must be at least 1".to_string(),
            ));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::ValidationError(format!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.retry.base_delay_ms, self.retry.max_delay_ms
            )));
        }
        Ok(())
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(path) = Self::default_config_path() {
            self.save_to_file(&path)
        } else {
            Err(ConfigError::ValidationError(
                "Could not determine config path".to_string(),
            ))
        }
    }

    /// Save configuration to a specific file
    pub fn save_to_file(&self, path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Get the server URL
    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server.host, self.server.port)
    }

    /// Ensure the qotd directory exists
    pub fn ensure_dirs() -> std::io::Result<()> {
        if let Some(dir) = Self::qotd_dir() {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.gemini.model, "gemini-2.0-flash");
        assert!(config.gemini.api_key.is_none());
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.quota.per_minute, 15);
        assert_eq!(config.retry.max_retries, 4);
        assert_eq!(config.seeding.per_category, 5);
        assert_eq!(config.seeding.max_attempts_per_category, 20);
        assert!(config.categories.iter().any(|c| c.name == "Wisdom"));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.server.port, parsed.server.port);
        assert_eq!(config.categories, parsed.categories);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[quota]
per_day = 42

[[categories]]
name = "Courage"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.quota.per_day, 42);
        // Defaults still applied
        assert_eq!(config.quota.per_minute, 15);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.categories.len(), 1);
        assert_eq!(config.categories[0].description, None);
    }

    #[test]
    fn test_validate_rejects_inverted_delays() {
        let mut config = Config::default();
        config.retry.base_delay_ms = 10_000;
        config.retry.max_delay_ms = 100;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
