//! Redis-backed fixed-window counters shared across instances.

use hangar_common::constants::redis_keys::RATELIMIT_PREFIX;
use hangar_common::{GuardError, RateLimitOutcome};
use redis::Script;
use redis::aio::ConnectionManager;
use std::time::Duration;

/// Open-or-increment in one round trip so concurrent instances agree.
/// Returns {allowed, count}; a denied request leaves the count untouched.
const WINDOW_SCRIPT: &str = r"
local current = redis.call('GET', KEYS[1])
if not current then
    redis.call('SET', KEYS[1], 1, 'PX', ARGV[2])
    return {1, 1}
end
current = tonumber(current)
if current >= tonumber(ARGV[1]) then
    return {0, current}
end
redis.call('INCR', KEYS[1])
return {1, current + 1}
";

/// Fixed-window limiter backed by Redis
pub struct RedisRateLimiter {
    redis: ConnectionManager,
    script: Script,
}

impl RedisRateLimiter {
    pub fn new(redis: ConnectionManager) -> Self {
        Self {
            redis,
            script: Script::new(WINDOW_SCRIPT),
        }
    }

    pub async fn check(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
    ) -> Result<RateLimitOutcome, GuardError> {
        let mut conn = self.redis.clone();
        let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX).max(1);

        let (allowed, count): (i64, i64) = self
            .script
            .key(format!("{RATELIMIT_PREFIX}{key}"))
            .arg(limit)
            .arg(window_ms)
            .invoke_async(&mut conn)
            .await?;

        if allowed == 1 {
            let count = u32::try_from(count).unwrap_or(u32::MAX);
            Ok(RateLimitOutcome::allowed(limit.saturating_sub(count)))
        } else {
            Ok(RateLimitOutcome::denied())
        }
    }
}
