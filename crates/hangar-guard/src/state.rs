//! Application state and shared resources.

use anyhow::{Context, Result};
use hangar_common::RateLimitOutcome;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use std::time::Duration;

use crate::captcha::{
    CaptchaGenerator, CaptchaVerifier, ChallengeStore, MemoryChallengeStore, RedisChallengeStore,
};
use crate::config::AppConfig;
use crate::ratelimit::{MemoryRateLimiter, RateLimiter, RedisRateLimiter};
use crate::risk::RiskScorer;
use crate::spam::{ContentHistory, MemoryContentHistory, RedisContentHistory, SpamChecker};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// Redis connection manager (auto-reconnecting), when configured
    pub redis: Option<ConnectionManager>,

    /// Fixed-window rate limiter
    pub rate_limiter: Arc<RateLimiter>,

    /// Issued CAPTCHA challenges
    pub challenges: Arc<ChallengeStore>,

    /// CAPTCHA generator
    pub captcha_generator: Arc<CaptchaGenerator>,

    /// CAPTCHA verifier
    pub captcha_verifier: Arc<CaptchaVerifier>,

    /// Spam heuristics
    pub spam_checker: Arc<SpamChecker>,

    /// Account risk scoring
    pub risk_scorer: Arc<RiskScorer>,
}

impl AppState {
    /// Create application state, connecting to Redis if a URL is configured
    pub async fn new(config: AppConfig) -> Result<Self> {
        let Some(url) = config.redis_url.clone() else {
            tracing::warn!("No Redis URL configured, using in-process stores");
            return Ok(Self::in_memory(config));
        };

        // Connect to Redis with connection manager (handles reconnection)
        let client = redis::Client::open(url.as_str()).context("Failed to create Redis client")?;
        let redis = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        let rate_limiter = RateLimiter::Redis(RedisRateLimiter::new(redis.clone()));
        let challenges = ChallengeStore::Redis(RedisChallengeStore::new(redis.clone()));
        let history: Arc<dyn ContentHistory> = Arc::new(RedisContentHistory::new(
            redis.clone(),
            config.spam.history_ttl(),
        ));

        Ok(Self::assemble(
            config,
            Some(redis),
            rate_limiter,
            challenges,
            history,
        ))
    }

    /// State backed entirely by process-local stores
    pub fn in_memory(config: AppConfig) -> Self {
        let history = Arc::new(MemoryContentHistory::new(config.spam.history_ttl()));
        Self::assemble(
            config,
            None,
            RateLimiter::Memory(MemoryRateLimiter::new()),
            ChallengeStore::Memory(MemoryChallengeStore::new()),
            history,
        )
    }

    fn assemble(
        config: AppConfig,
        redis: Option<ConnectionManager>,
        rate_limiter: RateLimiter,
        challenges: ChallengeStore,
        history: Arc<dyn ContentHistory>,
    ) -> Self {
        let captcha_generator = Arc::new(CaptchaGenerator::new(config.captcha.challenge_ttl_secs));
        let spam_checker = Arc::new(SpamChecker::new(
            history,
            config.spam.history_depth,
            Duration::from_millis(config.spam.lookup_timeout_ms),
        ));
        let risk_scorer = Arc::new(RiskScorer::new(config.risk.suspicious_ip_prefixes.clone()));

        Self {
            config,
            redis,
            rate_limiter: Arc::new(rate_limiter),
            challenges: Arc::new(challenges),
            captcha_generator,
            captcha_verifier: Arc::new(CaptchaVerifier::new()),
            spam_checker,
            risk_scorer,
        }
    }

    /// Rate-limit `key`, resolving store faults with the configured policy
    pub async fn throttle(&self, key: &str, limit: u32, window: Duration) -> RateLimitOutcome {
        match self.rate_limiter.check(key, limit, window).await {
            Ok(outcome) => outcome,
            Err(e) if self.config.rate_limit.fail_open => {
                tracing::warn!(key = %key, error = %e, "Rate limiter unavailable, failing open");
                RateLimitOutcome::allowed(limit)
            }
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Rate limiter unavailable, failing closed");
                RateLimitOutcome::denied()
            }
        }
    }

    /// True when every configured dependency answers
    pub async fn dependencies_ready(&self) -> bool {
        let Some(redis) = &self.redis else {
            return true;
        };
        let mut conn = redis.clone();
        let result: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
        result.is_ok()
    }
}
