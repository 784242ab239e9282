//! Quota tracking and enforcement.
//!
//! [`QuotaTracker`] holds the per-minute and per-day generation counters for
//! this process. Counters live in memory only: a restart forgets them, which
//! is acceptable because the daily cap is advisory.
//!
//! Reset rules:
//! - the minute window opens on the first call after the previous window
//!   expired and lasts sixty seconds;
//! - the daily counter resets when the UTC calendar day of the injected clock
//!   changes.

use crate::clock::{utc_midnight, Clock, SharedClock};
use crate::config::QuotaConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

const MINUTE: Duration = Duration::from_secs(60);

/// Errors related to quota management
#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("Daily quota exceeded: {current}/{limit} requests today")]
    DailyQuotaExceeded { current: u32, limit: u32 },
}

/// Usage statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageStats {
    pub requests_today: u32,
    pub requests_last_minute: u32,
    pub last_error: Option<String>,
}

struct QuotaState {
    day: DateTime<Utc>,
    day_count: u32,
    window_start: Option<Instant>,
    window_count: u32,
    last_request: Option<Instant>,
    last_error: Option<String>,
}

/// What the caller has to do before it may issue a request
enum Admission {
    Granted,
    Wait(Duration),
}

/// Manages quota tracking and enforcement
pub struct QuotaTracker {
    config: QuotaConfig,
    clock: SharedClock,
    state: Mutex<QuotaState>,
}

impl QuotaTracker {
    pub fn new(config: QuotaConfig, clock: SharedClock) -> Self {
        let day = utc_midnight(clock.utc());
        Self {
            config,
            clock,
            state: Mutex::new(QuotaState {
                day,
                day_count: 0,
                window_start: None,
                window_count: 0,
                last_request: None,
                last_error: None,
            }),
        }
    }

    pub fn config(&self) -> &QuotaConfig {
        &self.config
    }

    /// Wait until a request is allowed, then count it.
    ///
    /// Fails immediately once the daily cap is spent; the per-minute cap and
    /// the minimum spacing only suspend the calling task.
    #[instrument(skip(self))]
    pub async fn acquire(&self) -> Result<(), QuotaError> {
        loop {
            let admission = {
                let mut state = self.state.lock().await;
                self.admit(&mut state, Instant::now())?
            };

            match admission {
                Admission::Granted => return Ok(()),
                Admission::Wait(wait) => {
                    debug!("Quota: waiting {:?} before next request", wait);
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    fn admit(&self, state: &mut QuotaState, now: Instant) -> Result<Admission, QuotaError> {
        let today = utc_midnight(self.clock.utc());
        if today != state.day {
            debug!("Quota: new UTC day, resetting daily counter");
            state.day = today;
            state.day_count = 0;
        }

        if state.day_count >= self.config.per_day {
            warn!(
                "Daily quota exceeded: {}/{}",
                state.day_count, self.config.per_day
            );
            return Err(QuotaError::DailyQuotaExceeded {
                current: state.day_count,
                limit: self.config.per_day,
            });
        }

        if let Some(start) = state.window_start {
            let elapsed = now.duration_since(start);
            if elapsed >= MINUTE {
                state.window_start = None;
                state.window_count = 0;
            } else if state.window_count >= self.config.per_minute {
                debug!(
                    "Minute quota reached: {}/{}",
                    state.window_count, self.config.per_minute
                );
                return Ok(Admission::Wait(MINUTE - elapsed));
            }
        }

        if let Some(last) = state.last_request {
            let since = now.duration_since(last);
            let spacing = self.config.min_interval();
            if since < spacing {
                return Ok(Admission::Wait(spacing - since));
            }
        }

        if state.window_start.is_none() {
            state.window_start = Some(now);
        }
        state.window_count += 1;
        state.day_count += 1;
        state.last_request = Some(now);

        debug!(
            "Quota check passed: minute={}/{}, day={}/{}",
            state.window_count, self.config.per_minute, state.day_count, self.config.per_day
        );

        Ok(Admission::Granted)
    }

    /// Remember the most recent upstream failure
    pub async fn record_error(&self, error: impl Into<String>) {
        self.state.lock().await.last_error = Some(error.into());
    }

    /// Whether today's budget is already spent
    pub async fn daily_exhausted(&self) -> bool {
        self.stats().await.requests_today >= self.config.per_day
    }

    /// Get current usage statistics
    pub async fn stats(&self) -> UsageStats {
        let state = self.state.lock().await;
        let today = utc_midnight(self.clock.utc());
        let requests_today = if today == state.day { state.day_count } else { 0 };
        let requests_last_minute = match state.window_start {
            Some(start) if start.elapsed() < MINUTE => state.window_count,
            _ => 0,
        };

        UsageStats {
            requests_today,
            requests_last_minute,
            last_error: state.last_error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::FixedClock;
    use std::sync::Arc;

    fn tracker(per_minute: u32, per_day: u32, min_interval_ms: u64) -> (QuotaTracker, Arc<FixedClock>) {
        let clock = FixedClock::at("2024-06-01T10:00:00Z");
        let config = QuotaConfig {
            per_minute,
            per_day,
            min_interval_ms,
        };
        (QuotaTracker::new(config, clock.clone()), clock)
    }

    #[tokio::test(start_paused = true)]
    async fn test_counts_requests() {
        let (quota, _clock) = tracker(10, 10, 0);
        for _ in 0..3 {
            quota.acquire().await.unwrap();
        }
        let stats = quota.stats().await;
        assert_eq!(stats.requests_today, 3);
        assert_eq!(stats.requests_last_minute, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_daily_quota_enforcement() {
        let (quota, _clock) = tracker(10, 2, 0);
        quota.acquire().await.unwrap();
        quota.acquire().await.unwrap();

        let result = quota.acquire().await;
        assert!(matches!(
            result,
            Err(QuotaError::DailyQuotaExceeded { current: 2, limit: 2 })
        ));
        assert!(quota.daily_exhausted().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_daily_counter_resets_at_utc_midnight() {
        let (quota, clock) = tracker(10, 1, 0);
        quota.acquire().await.unwrap();
        assert!(quota.acquire().await.is_err());

        clock.advance_days(1);
        assert_eq!(quota.stats().await.requests_today, 0);
        quota.acquire().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_minute_cap_waits_for_window() {
        let (quota, _clock) = tracker(2, 100, 0);
        let start = Instant::now();

        quota.acquire().await.unwrap();
        quota.acquire().await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));

        quota.acquire().await.unwrap();
        assert!(start.elapsed() >= MINUTE);
        assert_eq!(quota.stats().await.requests_last_minute, 1);
        assert_eq!(quota.stats().await.requests_today, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_min_interval_spacing() {
        let (quota, _clock) = tracker(100, 100, 500);
        let start = Instant::now();

        quota.acquire().await.unwrap();
        quota.acquire().await.unwrap();
        quota.acquire().await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_record_error() {
        let (quota, _clock) = tracker(10, 10, 0);
        quota.record_error("Gemini is overloaded").await;
        assert_eq!(
            quota.stats().await.last_error.as_deref(),
            Some("Gemini is overloaded")
        );
    }
}
