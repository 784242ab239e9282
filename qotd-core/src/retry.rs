//! Retry and rate-limit wrapper around a [`TextGenerator`].
//!
//! Every attempt passes through the [`QuotaTracker`] first. Transient upstream
//! failures (overloaded / rate limited) are retried with exponential backoff;
//! anything else is returned to the caller untouched.

use crate::config::RetryConfig;
use crate::gemini::{GeminiError, TextGenerator};
use crate::quota::{QuotaError, QuotaTracker};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

/// Errors surfaced by [`ResilientGenerator`]
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation quota exhausted: {0}")]
    QuotaExhausted(#[from] QuotaError),

    #[error("Gemini still unavailable after {attempts} attempts: {last_error}")]
    RetryExhausted { attempts: u32, last_error: String },

    #[error(transparent)]
    Upstream(GeminiError),

    #[error("Generation cancelled")]
    Cancelled,
}

/// Backoff schedule for transient failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based): base * 2^retry, capped
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

/// Resolves once `cancel` flips to `true`; never resolves if the sender is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|flag| *flag).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Generator guarded by the shared quota and a retry policy
pub struct ResilientGenerator {
    inner: Arc<dyn TextGenerator>,
    quota: Arc<QuotaTracker>,
    policy: RetryPolicy,
}

impl ResilientGenerator {
    pub fn new(inner: Arc<dyn TextGenerator>, quota: Arc<QuotaTracker>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            quota,
            policy,
        }
    }

    pub fn quota(&self) -> &Arc<QuotaTracker> {
        &self.quota
    }

    /// Generate text for `prompt`, waiting out quota and backoff as needed
    pub async fn call_with_retry(&self, prompt: &str) -> Result<String, GenerationError> {
        let (_tx, rx) = watch::channel(false);
        self.call_with_cancel(prompt, rx).await
    }

    /// Like [`call_with_retry`](Self::call_with_retry), aborting when `cancel` becomes `true`
    #[instrument(skip(self, prompt, cancel), fields(prompt_len = prompt.len()))]
    pub async fn call_with_cancel(
        &self,
        prompt: &str,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<String, GenerationError> {
        let mut retry = 0;
        loop {
            if *cancel.borrow() {
                return Err(GenerationError::Cancelled);
            }

            tokio::select! {
                acquired = self.quota.acquire() => acquired?,
                _ = cancelled(&mut cancel) => return Err(GenerationError::Cancelled),
            }

            let err = match self.inner.generate(prompt).await {
                Ok(text) => return Ok(text),
                Err(err) => err,
            };
            self.quota.record_error(err.to_string()).await;

            if !err.is_transient() {
                return Err(GenerationError::Upstream(err));
            }
            if retry >= self.policy.max_retries {
                warn!("Giving up after {} attempts: {}", retry + 1, err);
                return Err(GenerationError::RetryExhausted {
                    attempts: retry + 1,
                    last_error: err.to_string(),
                });
            }

            let delay = self.policy.delay_for(retry);
            warn!("Gemini unavailable ({}), retrying in {:?}", err, delay);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancelled(&mut cancel) => return Err(GenerationError::Cancelled),
            }
            retry += 1;
            debug!("Retry {} of {}", retry, self.policy.max_retries);
        }
    }
}
