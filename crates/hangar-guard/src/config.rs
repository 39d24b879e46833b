//! Configuration management for Guard.

use anyhow::{Context, Result};
use hangar_common::CaptchaDifficulty;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use hangar_common::constants::{
    CAPTCHA_GENERATE_LIMIT, CAPTCHA_GENERATE_WINDOW_SECS, CAPTCHA_TTL_SECS, DEFAULT_LISTEN_ADDR,
    DEFAULT_RATE_LIMIT, DEFAULT_RATE_WINDOW_SECS, SPAM_HISTORY_DEPTH, SPAM_HISTORY_TTL_SECS,
    SPAM_LOOKUP_TIMEOUT_MS,
};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Redis connection URL; in-process stores are used when absent
    #[serde(default)]
    pub redis_url: Option<String>,

    /// CAPTCHA configuration
    #[serde(default)]
    pub captcha: CaptchaConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Spam heuristics configuration
    #[serde(default)]
    pub spam: SpamConfig,

    /// Risk scoring configuration
    #[serde(default)]
    pub risk: RiskConfig,
}

/// CAPTCHA-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CaptchaConfig {
    /// Challenge validity in seconds
    #[serde(default = "default_challenge_ttl")]
    pub challenge_ttl_secs: u64,

    /// Puzzle difficulty
    #[serde(default)]
    pub difficulty: CaptchaDifficulty,

    /// Challenges a client IP may request per window
    #[serde(default = "default_generate_limit")]
    pub generate_limit: u32,

    /// Window for `generate_limit` in seconds
    #[serde(default = "default_generate_window")]
    pub generate_window_secs: u64,
}

impl CaptchaConfig {
    pub fn generate_window(&self) -> Duration {
        Duration::from_secs(self.generate_window_secs)
    }
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            challenge_ttl_secs: default_challenge_ttl(),
            difficulty: CaptchaDifficulty::default(),
            generate_limit: default_generate_limit(),
            generate_window_secs: default_generate_window(),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Default requests allowed per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Default window length in seconds
    #[serde(default = "default_window")]
    pub window_secs: u64,

    /// Allow requests when the backing store is unreachable
    #[serde(default = "default_fail_open")]
    pub fail_open: bool,

    /// How often expired in-memory entries are swept
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window(),
            fail_open: default_fail_open(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Spam heuristics configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SpamConfig {
    /// Prior posts compared by the duplicate check
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,

    /// Upper bound on the duplicate-content lookup
    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout_ms: u64,

    /// Idle time after which an author's history is forgotten
    #[serde(default = "default_history_ttl")]
    pub history_ttl_secs: u64,
}

impl SpamConfig {
    pub fn history_ttl(&self) -> Duration {
        Duration::from_secs(self.history_ttl_secs.max(1))
    }
}

impl Default for SpamConfig {
    fn default() -> Self {
        Self {
            history_depth: default_history_depth(),
            lookup_timeout_ms: default_lookup_timeout(),
            history_ttl_secs: default_history_ttl(),
        }
    }
}

/// Risk scoring configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RiskConfig {
    /// IP prefixes considered suspicious (e.g. known proxy ranges)
    #[serde(default)]
    pub suspicious_ip_prefixes: Vec<String>,
}

// Default value functions
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_challenge_ttl() -> u64 { CAPTCHA_TTL_SECS }
fn default_generate_limit() -> u32 { CAPTCHA_GENERATE_LIMIT }
fn default_generate_window() -> u64 { CAPTCHA_GENERATE_WINDOW_SECS }
fn default_max_requests() -> u32 { DEFAULT_RATE_LIMIT }
fn default_window() -> u64 { DEFAULT_RATE_WINDOW_SECS }
fn default_fail_open() -> bool { true }
fn default_sweep_interval() -> u64 { 60 }
fn default_history_depth() -> usize { SPAM_HISTORY_DEPTH }
fn default_lookup_timeout() -> u64 { SPAM_LOOKUP_TIMEOUT_MS }
fn default_history_ttl() -> u64 { SPAM_HISTORY_TTL_SECS }

impl AppConfig {
    /// Load configuration from file, with CLI overrides
    pub fn load(
        config_path: &str,
        redis_url: Option<String>,
        listen_addr: Option<String>,
    ) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let settings = config::Config::builder()
                .add_source(config::File::with_name(config_path))
                .build()
                .context("Failed to load config file")?;

            settings
                .try_deserialize()
                .context("Failed to parse config")?
        } else {
            // Use defaults if config file doesn't exist
            tracing::warn!("Config file not found, using defaults");
            Self::default()
        };

        // Apply CLI overrides
        if redis_url.is_some() {
            config.redis_url = redis_url;
        }
        if let Some(listen) = listen_addr {
            config.listen_addr = listen;
        }

        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            redis_url: None,
            captcha: CaptchaConfig::default(),
            rate_limit: RateLimitConfig::default(),
            spam: SpamConfig::default(),
            risk: RiskConfig::default(),
        }
    }
}
