//! Rate limiter: one accepted request per requester per window.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::error::Rejection;

/// Per-requester admission window.
///
/// Keyed by requester name only; connections and resource keys play no part.
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    last_accepted: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl RateLimiter {
    pub const DEFAULT_WINDOW_MS: u64 = 300_000;

    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: Mutex::new(HashMap::new()),
        }
    }

    /// Admit `requester` at `now`, recording the time on success.
    ///
    /// Check and record happen under one lock, so two concurrent requests
    /// from the same requester cannot both be admitted. A rejected request
    /// leaves the recorded time untouched.
    pub fn try_admit(&self, requester: &str, now: DateTime<Utc>) -> Result<(), Rejection> {
        let mut last_accepted = self.last_accepted.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(last) = last_accepted.get(requester)
            && now.signed_duration_since(*last) < self.window
        {
            return Err(Rejection::RateLimited(requester.to_string()));
        }
        last_accepted.insert(requester.to_string(), now);
        Ok(())
    }

    pub fn last_accepted(&self, requester: &str) -> Option<DateTime<Utc>> {
        self.last_accepted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(requester)
            .copied()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::milliseconds(Self::DEFAULT_WINDOW_MS as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn second_request_within_window_is_rejected() {
        let limiter = RateLimiter::default();
        assert!(limiter.try_admit("Client1", t0()).is_ok());

        let err = limiter
            .try_admit("Client1", t0() + Duration::seconds(10))
            .unwrap_err();
        assert_eq!(err, Rejection::RateLimited("Client1".to_string()));
        assert_eq!(
            err.to_string(),
            "Rate limit exceeded for client: Client1"
        );
    }

    #[test]
    fn rejection_does_not_move_the_window() {
        let limiter = RateLimiter::default();
        limiter.try_admit("Client1", t0()).unwrap();
        let _ = limiter.try_admit("Client1", t0() + Duration::seconds(299));
        assert_eq!(limiter.last_accepted("Client1"), Some(t0()));

        // window は最初の受理時刻から数える
        assert!(limiter.try_admit("Client1", t0() + Duration::seconds(300)).is_ok());
        assert_eq!(
            limiter.last_accepted("Client1"),
            Some(t0() + Duration::seconds(300))
        );
    }

    #[test]
    fn requesters_are_independent() {
        let limiter = RateLimiter::default();
        assert!(limiter.try_admit("Client1", t0()).is_ok());
        assert!(limiter.try_admit("Client2", t0()).is_ok());
    }

    #[test]
    fn custom_window() {
        let limiter = RateLimiter::new(Duration::milliseconds(50));
        limiter.try_admit("c", t0()).unwrap();
        assert!(limiter.try_admit("c", t0() + Duration::milliseconds(49)).is_err());
        assert!(limiter.try_admit("c", t0() + Duration::milliseconds(50)).is_ok());
    }
}
