//! Calendar-day helpers on top of an injectable clock.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use std::sync::Arc;

pub use mockable::{Clock, DefaultClock};

/// Shared clock handle used by the quota tracker, the seeding job and the resolver.
pub type SharedClock = Arc<dyn Clock + Send + Sync>;

/// Wall-clock time source.
pub fn system_clock() -> SharedClock {
    Arc::new(DefaultClock)
}

/// UTC midnight at the start of the day containing `now`.
pub fn utc_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN))
}

/// Half-open `[today, tomorrow)` range for the UTC day containing `now`.
pub fn day_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = utc_midnight(now);
    (today, today + Duration::days(1))
}

/// Whole days since the Unix epoch.
pub fn day_number(day: DateTime<Utc>) -> i64 {
    day.timestamp().div_euclid(86_400)
}

/// Time left until the next UTC midnight.
pub fn until_next_midnight(now: DateTime<Utc>) -> std::time::Duration {
    let (_, tomorrow) = day_bounds(now);
    (tomorrow - now).to_std().unwrap_or_default()
}
