//! Per-user cooldown rate limiter.

use crate::error::{SecurityError, SecurityResult};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Enforces a minimum interval between accepted questions from one user.
pub struct RateLimiter {
    /// Minimum time between two accepted requests of the same user.
    min_interval: Duration,
    /// Last accepted request per user.
    last_seen: DashMap<String, Instant>,
}

impl RateLimiter {
    /// Create a new rate limiter.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_seen: DashMap::new(),
        }
    }

    /// Record a request for `user`, or fail if the previous one was too recent.
    pub fn check(&self, user: &str) -> SecurityResult<()> {
        self.check_at(user, Instant::now())
    }

    fn check_at(&self, user: &str, now: Instant) -> SecurityResult<()> {
        match self.last_seen.entry(user.to_string()) {
            Entry::Occupied(mut entry) => {
                let elapsed = now.saturating_duration_since(*entry.get());
                if elapsed < self.min_interval {
                    let remaining = self.min_interval - elapsed;
                    let retry_after_secs = remaining.as_secs()
                        + u64::from(remaining.subsec_nanos() > 0);
                    warn!(
                        "Rate limit exceeded for user {}: retry in {}s",
                        user, retry_after_secs
                    );
                    return Err(SecurityError::RateLimited { retry_after_secs });
                }
                entry.insert(now);
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
            }
        }
        debug!("Rate limit permit granted for user {}", user);
        Ok(())
    }

    /// Drop entries whose cooldown has already elapsed.
    pub fn purge_expired(&self) {
        let min_interval = self.min_interval;
        self.last_seen
            .retain(|_, last| last.elapsed() < min_interval);
    }

    /// Get current status.
    pub fn status(&self) -> RateLimitStatus {
        RateLimitStatus {
            min_interval: self.min_interval,
            tracked_users: self.last_seen.len(),
        }
    }
}

/// Rate limiter status.
#[derive(Debug, Clone)]
pub struct RateLimitStatus {
    pub min_interval: Duration,
    pub tracked_users: usize,
}
