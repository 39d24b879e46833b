//! Heuristic spam scoring.
//!
//! Four independent signals are summed and clamped to `[0, 1]`: link
//! density, repeated three-word phrases, capitalisation, and similarity to
//! the author's recent submissions. Only the last one touches storage, and a
//! failed or slow lookup simply contributes nothing.

mod history;

pub use history::{ContentHistory, MemoryContentHistory, RedisContentHistory};

use futures::future::BoxFuture;
use hangar_common::{GuardError, SpamReport};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Accumulates weighted signals with their reasons
#[derive(Default)]
struct Signals {
    score: f64,
    reasons: Vec<String>,
}

impl Signals {
    fn add(&mut self, weight: f64, reason: &str) {
        self.score += weight;
        self.reasons.push(reason.to_string());
    }

    fn into_report(self) -> SpamReport {
        SpamReport {
            score: self.score.clamp(0.0, 1.0),
            reasons: self.reasons,
        }
    }
}

fn is_link(token: &str) -> bool {
    token.contains("http://") || token.contains("https://")
}

/// Short posts stuffed with links, link-heavy posts, then sheer link count.
/// Only the first matching condition scores.
fn check_link_density(words: &[&str], signals: &mut Signals) {
    let word_count = words.len();
    let links = words.iter().filter(|w| is_link(w)).count();
    if links == 0 {
        return;
    }

    if word_count < 20 && links >= 2 {
        signals.add(0.4, "very short content with multiple links");
    } else if links as f64 / word_count as f64 > 0.3 {
        signals.add(0.35, "high link density");
    } else if links > 5 {
        signals.add(0.25, "excessive number of links");
    }
}

fn check_repeated_phrases(words: &[&str], signals: &mut Signals) {
    let lowered: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();
    let mut phrases: HashMap<String, usize> = HashMap::new();
    for window in lowered.windows(3) {
        *phrases.entry(window.join(" ")).or_default() += 1;
    }

    let max_repeats = phrases.values().copied().max().unwrap_or(0);
    if max_repeats >= 4 {
        signals.add(0.3, "heavily repeated phrases");
    } else if max_repeats >= 3 {
        signals.add(0.15, "repeated phrases");
    }
}

fn check_caps(content: &str, signals: &mut Signals) {
    let (letters, upper) = content
        .chars()
        .filter(|c| c.is_alphabetic())
        .fold((0usize, 0usize), |(letters, upper), c| {
            (letters + 1, upper + usize::from(c.is_uppercase()))
        });

    if letters > 0 && upper as f64 / letters as f64 > 0.5 {
        signals.add(0.2, "excessive capital letters");
    }
}

/// Lowercased words with punctuation stripped
fn word_set(content: &str) -> HashSet<String> {
    content
        .split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

fn check_similarity(content: &str, previous: &[String], signals: &mut Signals) {
    let current = word_set(content);
    let max_similarity = previous
        .iter()
        .map(|p| jaccard(&current, &word_set(p)))
        .fold(0.0, f64::max);

    if max_similarity > 0.85 {
        signals.add(0.4, "near-duplicate of recent content");
    } else if max_similarity > 0.6 {
        signals.add(0.2, "similar to recent content");
    }
}

fn content_signals(content: &str) -> Signals {
    let mut signals = Signals::default();
    let words: Vec<&str> = content.split_whitespace().collect();
    check_link_density(&words, &mut signals);
    check_repeated_phrases(&words, &mut signals);
    check_caps(content, &mut signals);
    signals
}

/// Score content using only the signals that need no storage
pub fn score_content(content: &str) -> SpamReport {
    content_signals(content).into_report()
}

/// Spam scorer with access to content history
pub struct SpamChecker {
    history: Arc<dyn ContentHistory>,
    depth: usize,
    lookup_timeout: Duration,
}

impl SpamChecker {
    pub fn new(history: Arc<dyn ContentHistory>, depth: usize, lookup_timeout: Duration) -> Self {
        Self {
            history,
            depth,
            lookup_timeout,
        }
    }

    /// Score `content` submitted by `author_id`
    pub async fn check_spam_content(&self, content: &str, author_id: &str) -> SpamReport {
        let mut signals = content_signals(content);
        if let Some(previous) = self.recent_content(author_id).await {
            check_similarity(content, &previous, &mut signals);
        }

        let report = signals.into_report();
        tracing::debug!(
            author_id = %author_id,
            score = report.score,
            reasons = ?report.reasons,
            "Scored content"
        );
        report
    }

    /// Add `content` to the author's history; failures are logged only
    pub async fn record(&self, author_id: &str, content: &str) {
        let recorded = self
            .bounded("content history write", self.history.record(author_id, content, self.depth))
            .await;
        if let Err(e) = recorded {
            tracing::warn!(author_id = %author_id, error = %e, "Failed to record content history");
        }
    }

    /// Forget authors whose history has gone idle
    pub fn sweep(&self) -> usize {
        self.history.sweep()
    }

    async fn recent_content(&self, author_id: &str) -> Option<Vec<String>> {
        let lookup = self
            .bounded("content history lookup", self.history.recent(author_id, self.depth))
            .await;

        match lookup {
            Ok(previous) => Some(previous),
            Err(e) => {
                tracing::warn!(
                    author_id = %author_id,
                    error = %e,
                    "Content history unavailable, skipping duplicate check"
                );
                None
            }
        }
    }

    /// Run a history call under the lookup deadline
    async fn bounded<T>(
        &self,
        operation: &str,
        call: BoxFuture<'_, Result<T, GuardError>>,
    ) -> Result<T, GuardError> {
        match tokio::time::timeout(self.lookup_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GuardError::Timeout(format!(
                "{operation} after {}ms",
                self.lookup_timeout.as_millis()
            ))),
        }
    }
}
