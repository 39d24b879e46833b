//! Background eviction of expired in-process state.

use std::sync::Arc;
use std::time::Duration;

use crate::captcha::ChallengeStore;
use crate::ratelimit::RateLimiter;
use crate::spam::SpamChecker;

/// Entries removed by one eviction pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Swept {
    pub windows: usize,
    pub challenges: usize,
    pub authors: usize,
}

/// One eviction pass over every in-process store
pub fn sweep_once(
    rate_limiter: &RateLimiter,
    challenges: &ChallengeStore,
    spam: &SpamChecker,
) -> Swept {
    let swept = Swept {
        windows: rate_limiter.sweep(),
        challenges: challenges.sweep(chrono::Utc::now().timestamp()),
        authors: spam.sweep(),
    };
    if swept != Swept::default() {
        tracing::debug!(
            windows = swept.windows,
            challenges = swept.challenges,
            authors = swept.authors,
            "Swept expired entries"
        );
    }
    swept
}

/// Background worker that evicts expired rate-limit windows, challenges
/// and idle content history
pub async fn sweeper_worker(
    rate_limiter: Arc<RateLimiter>,
    challenges: Arc<ChallengeStore>,
    spam: Arc<SpamChecker>,
    every: Duration,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) {
    tracing::info!(
        interval_secs = every.as_secs(),
        backend = rate_limiter.backend(),
        "🧹 Sweeper started"
    );

    let mut interval = tokio::time::interval(every);
    // The first tick completes immediately
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                sweep_once(&rate_limiter, &challenges, &spam);
            }
            _ = shutdown.recv() => {
                tracing::info!("🧹 Sweeper shutting down...");
                break;
            }
        }
    }
}
