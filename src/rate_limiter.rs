use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::errors::{AppError, AppResult};

#[derive(Clone, Debug)]
struct RateLimitEntry {
    count: u32,
    window_start: DateTime<Utc>,
}

/// Fixed-window limiter keyed by an arbitrary string (e.g. a login email).
pub struct RateLimiter {
    entries: Mutex<HashMap<String, RateLimitEntry>>,
    /// Max hits per window
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_requests,
            window,
        }
    }

    /// Returns `Err(RateLimited)` while `key` has used up its window.
    pub fn check(&self, key: &str) -> AppResult<()> {
        self.check_at(key, Utc::now())
    }

    /// Record one hit for `key`.
    pub fn record(&self, key: &str) {
        self.record_at(key, Utc::now());
    }

    /// Forget `key` (e.g. after a successful login).
    pub fn reset(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }

    fn check_at(&self, key: &str, now: DateTime<Utc>) -> AppResult<()> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| AppError::Internal("rate limiter lock poisoned".into()))?;

        match entries.get(key) {
            Some(entry) if now < entry.window_start + self.window && entry.count >= self.max_requests => {
                let retry_after = (entry.window_start + self.window - now).num_seconds().max(0);
                Err(AppError::RateLimited(format!(
                    "Too many attempts. Try again in {} seconds.",
                    retry_after
                )))
            }
            _ => Ok(()),
        }
    }

    fn record_at(&self, key: &str, now: DateTime<Utc>) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };

        // Drop windows that have already run out.
        let window = self.window;
        entries.retain(|_, e| now < e.window_start + window);

        let entry = entries.entry(key.to_string()).or_insert_with(|| RateLimitEntry {
            count: 0,
            window_start: now,
        });

        if now >= entry.window_start + self.window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_after_limit_within_window() {
        let limiter = RateLimiter::new(2, Duration::minutes(15));
        let t0 = Utc::now();

        assert!(limiter.check_at("a@shop.test", t0).is_ok());
        limiter.record_at("a@shop.test", t0);
        limiter.record_at("a@shop.test", t0);

        let err = limiter.check_at("a@shop.test", t0 + Duration::seconds(5)).unwrap_err();
        assert!(matches!(err, AppError::RateLimited(_)));

        // other keys are unaffected
        assert!(limiter.check_at("b@shop.test", t0).is_ok());
    }

    #[test]
    fn window_expiry_resets() {
        let limiter = RateLimiter::new(1, Duration::seconds(60));
        let t0 = Utc::now();
        limiter.record_at("k", t0);
        assert!(limiter.check_at("k", t0).is_err());
        assert!(limiter.check_at("k", t0 + Duration::seconds(61)).is_ok());

        limiter.record_at("k", t0 + Duration::seconds(61));
        assert!(limiter.check_at("k", t0 + Duration::seconds(62)).is_err());
    }

    #[test]
    fn expired_windows_are_dropped() {
        let limiter = RateLimiter::new(5, Duration::minutes(15));
        let t0 = Utc::now();
        for i in 0..1_000 {
            limiter.record_at(&format!("ghost{i}@shop.test"), t0);
        }
        limiter.record_at("live@shop.test", t0 + Duration::minutes(1));
        assert_eq!(limiter.entries.lock().unwrap().len(), 1_001);

        limiter.record_at("late@shop.test", t0 + Duration::days(1));
        let entries = limiter.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("late@shop.test"));
    }

    #[test]
    fn reset_clears_key() {
        let limiter = RateLimiter::new(1, Duration::seconds(60));
        limiter.record("k");
        assert!(limiter.check("k").is_err());
        limiter.reset("k");
        assert!(limiter.check("k").is_ok());
    }
}
