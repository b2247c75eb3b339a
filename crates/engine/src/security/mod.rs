//! Sign-in throttling and the security event log.
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{EngineError, MutationCoordinator, ResultEngine, store::EntryStore};

mod audit;
mod rate_limit;

pub use audit::{DEFAULT_CAPACITY, SecurityEvent, SecurityEventKind, SecurityLog};
pub use rate_limit::RateLimiter;

/// Rate limiter key for sign-in attempts.
pub const SIGN_IN_ACTION: &str = "sign_in";

pub const SIGN_IN_RATE_LIMITED: &str = "Too many sign-in attempts. Please try again later.";

/// Gatekeeper in front of [`MutationCoordinator::sign_in`].
#[derive(Debug)]
pub struct AuthGuard {
    limiter: RateLimiter,
    log: Arc<SecurityLog>,
}

impl AuthGuard {
    pub fn new(limiter: RateLimiter, log: Arc<SecurityLog>) -> Self {
        Self { limiter, log }
    }

    pub fn log(&self) -> &Arc<SecurityLog> {
        &self.log
    }

    pub fn sign_in<S>(&self, coordinator: &MutationCoordinator<S>, user_id: &str) -> ResultEngine<()>
    where
        S: EntryStore + ?Sized,
    {
        self.sign_in_at(coordinator, user_id, Utc::now())
    }

    /// Count an attempt at `now`, then bind `user_id` to the coordinator.
    pub fn sign_in_at<S>(
        &self,
        coordinator: &MutationCoordinator<S>,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<()>
    where
        S: EntryStore + ?Sized,
    {
        if !self.limiter.check_at(SIGN_IN_ACTION, now) {
            self.log.rate_limit_exceeded(SIGN_IN_ACTION, None);
            self.log.auth_failure("rate_limit_exceeded", None);
            return Err(EngineError::RateLimited(SIGN_IN_RATE_LIMITED.to_string()));
        }
        match coordinator.sign_in(user_id) {
            Ok(()) => {
                self.log.auth_success(user_id);
                Ok(())
            }
            Err(err) => {
                self.log.auth_failure(&err.to_string(), None);
                Err(err)
            }
        }
    }

    pub fn sign_out<S>(&self, coordinator: &MutationCoordinator<S>)
    where
        S: EntryStore + ?Sized,
    {
        if let Some(user_id) = coordinator.current_user() {
            tracing::info!("signing out {user_id}");
        }
        coordinator.sign_out();
    }
}
