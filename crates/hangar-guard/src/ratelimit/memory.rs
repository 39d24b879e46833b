//! In-process fixed-window counters.

use hangar_common::RateLimitOutcome;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Checks between opportunistic sweeps of expired windows
const SWEEP_EVERY: u64 = 1_000;

struct Window {
    count: u32,
    reset_at: Instant,
}

#[derive(Default)]
struct Counters {
    windows: HashMap<String, Window>,
    checks_since_sweep: u64,
}

impl Counters {
    fn sweep(&mut self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, w| now < w.reset_at);
        self.checks_since_sweep = 0;
        before - self.windows.len()
    }
}

/// Fixed-window limiter backed by a process-local map
#[derive(Default)]
pub struct MemoryRateLimiter {
    counters: Mutex<Counters>,
}

impl MemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, key: &str, limit: u32, window: Duration) -> RateLimitOutcome {
        let now = Instant::now();
        let mut guard = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let counters = &mut *guard;

        counters.checks_since_sweep += 1;
        if counters.checks_since_sweep >= SWEEP_EVERY {
            counters.sweep(now);
        }

        match counters.windows.get_mut(key) {
            // Windows past reset_at count as absent
            Some(w) if now < w.reset_at => {
                if w.count >= limit {
                    return RateLimitOutcome::denied();
                }
                w.count += 1;
                RateLimitOutcome::allowed(limit - w.count)
            }
            _ => {
                counters.windows.insert(
                    key.to_string(),
                    Window {
                        count: 1,
                        reset_at: now + window,
                    },
                );
                RateLimitOutcome::allowed(limit.saturating_sub(1))
            }
        }
    }

    pub fn sweep(&self) -> usize {
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sweep(Instant::now())
    }

    /// Number of tracked windows, expired ones included
    pub fn len(&self) -> usize {
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .windows
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
