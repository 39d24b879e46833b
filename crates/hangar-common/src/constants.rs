//! Shared constants for Hangar components.

/// Default Guard HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8890";

/// CAPTCHA challenge validity (5 minutes)
pub const CAPTCHA_TTL_SECS: u64 = 300;

/// Extra time a challenge row outlives its expiry in Redis, so late
/// submissions report "expired" instead of "not found"
pub const CAPTCHA_GRACE_SECS: u64 = 60;

/// Challenge generations allowed per client IP per window
pub const CAPTCHA_GENERATE_LIMIT: u32 = 10;

/// Window for challenge generation limiting (seconds)
pub const CAPTCHA_GENERATE_WINDOW_SECS: u64 = 60;

/// Default request limit per window for general endpoints
pub const DEFAULT_RATE_LIMIT: u32 = 60;

/// Default rate-limit window (seconds)
pub const DEFAULT_RATE_WINDOW_SECS: u64 = 60;

/// Number of prior posts the duplicate-content check compares against
pub const SPAM_HISTORY_DEPTH: usize = 10;

/// Upper bound on the duplicate-content lookup (milliseconds)
pub const SPAM_LOOKUP_TIMEOUT_MS: u64 = 500;

/// How long an author's content history outlives their last post (7 days)
pub const SPAM_HISTORY_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Redis key prefixes
pub mod redis_keys {
    /// CAPTCHA challenge: captcha:{challenge_id}
    pub const CAPTCHA_PREFIX: &str = "captcha:";

    /// CAPTCHA consumption marker: captcha:used:{challenge_id}
    pub const CAPTCHA_USED_PREFIX: &str = "captcha:used:";

    /// Rate limit counters: ratelimit:{key}
    pub const RATELIMIT_PREFIX: &str = "ratelimit:";

    /// Recent content per author: content:{author_id}
    pub const CONTENT_PREFIX: &str = "content:";
}

/// HTTP header names
pub mod headers {
    /// Client address as forwarded by the edge proxy
    pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

    /// Client address set by nginx
    pub const X_REAL_IP: &str = "x-real-ip";

    /// Remaining requests in the current window
    pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
}
