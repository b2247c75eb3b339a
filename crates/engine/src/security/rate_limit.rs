use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Duration, Utc};

#[derive(Clone, Copy, Debug)]
struct Window {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// Fixed-window request counter keyed by action name.
///
/// The first call for a key opens a window of `window` length; at most
/// `max_requests` calls are allowed inside it.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Five attempts per five minutes.
    pub fn sign_in() -> Self {
        Self::new(5, Duration::minutes(5))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Window>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Utc::now())
    }

    /// Count one request for `key` at `now`; `false` once the window is full.
    pub fn check_at(&self, key: &str, now: DateTime<Utc>) -> bool {
        let mut windows = self.lock();
        match windows.get_mut(key) {
            Some(window) if now <= window.reset_at => {
                if window.count >= self.max_requests {
                    return false;
                }
                window.count += 1;
                true
            }
            _ => {
                windows.insert(
                    key.to_string(),
                    Window {
                        count: 1,
                        reset_at: now + self.window,
                    },
                );
                true
            }
        }
    }

    /// Requests still allowed for `key` at `now`.
    pub fn remaining_at(&self, key: &str, now: DateTime<Utc>) -> u32 {
        match self.lock().get(key) {
            Some(window) if now <= window.reset_at => {
                self.max_requests.saturating_sub(window.count)
            }
            _ => self.max_requests,
        }
    }

    /// Drop windows that expired before `now`.
    pub fn cleanup_at(&self, now: DateTime<Utc>) {
        self.lock().retain(|_, window| now <= window.reset_at);
    }

    pub fn cleanup(&self) {
        self.cleanup_at(Utc::now());
    }

    pub fn reset(&self) {
        self.lock().clear();
    }
}
