//! Fixed-window rate limiting.
//!
//! Both backends implement the same window: the first request for a key
//! opens a window of `window` length with count 1; later requests in the
//! window succeed while `count < limit`; a denied request does not count.
//!
//! Being over the limit is a normal outcome. A backing-store fault is an
//! `Err`, so callers choose between failing open or closed.

mod memory;
mod redis_window;

pub use memory::MemoryRateLimiter;
pub use redis_window::RedisRateLimiter;

use hangar_common::{GuardError, RateLimitOutcome};
use std::time::Duration;

/// Rate limiter with a backend chosen at startup
pub enum RateLimiter {
    /// Single-process map; not shared between instances
    Memory(MemoryRateLimiter),
    /// Shared counters for multi-instance deployments
    Redis(RedisRateLimiter),
}

impl RateLimiter {
    /// Count a request for `key` against `limit` per `window`
    pub async fn check(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
    ) -> Result<RateLimitOutcome, GuardError> {
        let outcome = match self {
            Self::Memory(limiter) => limiter.check(key, limit, window),
            Self::Redis(limiter) => limiter.check(key, limit, window).await?,
        };

        if !outcome.success {
            tracing::debug!(key = %key, limit = limit, "Rate limit exceeded");
        }

        Ok(outcome)
    }

    /// Drop expired windows; returns how many were removed
    pub fn sweep(&self) -> usize {
        match self {
            Self::Memory(limiter) => limiter.sweep(),
            // Redis expires keys itself
            Self::Redis(_) => 0,
        }
    }

    pub fn backend(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Redis(_) => "redis",
        }
    }
}
