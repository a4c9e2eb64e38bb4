//! Time sources for cache expiry.

use chrono::{DateTime, TimeDelta, Utc};
use std::fmt::Debug;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Source of the current instant.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// The wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to, in milliseconds since the epoch.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Creates a clock set at `millis` since the epoch.
    #[must_use]
    pub const fn at_millis(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    /// Moves the clock to `millis` since the epoch.
    pub fn set_millis(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    /// Moves the clock forward.
    pub fn advance(&self, duration: Duration) {
        let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Computes the instant an entry stored at `now` with `ttl` expires.
#[must_use]
pub fn expiry_of(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Returns true if an entry expiring at `expires_at` is dead at `now`.
#[must_use]
pub fn is_expired(now: DateTime<Utc>, expires_at: DateTime<Utc>) -> bool {
    now >= expires_at
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::at_millis(1000);
        assert_eq!(clock.now().timestamp_millis(), 1000);
        clock.advance(Duration::from_millis(9));
        assert_eq!(clock.now().timestamp_millis(), 1009);
        clock.set_millis(5);
        assert_eq!(clock.now().timestamp_millis(), 5);
    }

    #[test]
    fn test_expiry_boundary() {
        let clock = ManualClock::at_millis(1000);
        let expires_at = expiry_of(clock.now(), Duration::from_millis(10));
        clock.set_millis(1009);
        assert!(!is_expired(clock.now(), expires_at));
        clock.set_millis(1010);
        assert!(is_expired(clock.now(), expires_at));
    }

    #[test]
    fn test_expiry_saturates() {
        let expires_at = expiry_of(Utc::now(), Duration::MAX);
        assert_eq!(expires_at, DateTime::<Utc>::MAX_UTC);
    }
}
