//! Per-author content history for near-duplicate detection.
//!
//! An author's history lives for a fixed idle period after their last post.
//! Redis enforces it with a key TTL; the in-process map forgets idle authors
//! on read and drops them on `sweep`.

use futures::FutureExt;
use futures::future::BoxFuture;
use hangar_common::GuardError;
use hangar_common::constants::redis_keys::CONTENT_PREFIX;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Source of an author's recent submissions, newest first
pub trait ContentHistory: Send + Sync {
    /// Up to `limit` most recent pieces of content by `author_id`
    fn recent(&self, author_id: &str, limit: usize) -> BoxFuture<'_, Result<Vec<String>, GuardError>>;

    /// Remember `content`, keeping at most `depth` entries per author
    fn record(
        &self,
        author_id: &str,
        content: &str,
        depth: usize,
    ) -> BoxFuture<'_, Result<(), GuardError>>;

    /// Drop idle authors; returns how many were removed
    fn sweep(&self) -> usize {
        0
    }
}

struct AuthorPosts {
    posts: VecDeque<String>,
    last_post: Instant,
}

/// Process-local history
pub struct MemoryContentHistory {
    authors: Mutex<HashMap<String, AuthorPosts>>,
    idle_ttl: Duration,
}

impl MemoryContentHistory {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            authors: Mutex::new(HashMap::new()),
            idle_ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.authors.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ContentHistory for MemoryContentHistory {
    fn recent(&self, author_id: &str, limit: usize) -> BoxFuture<'_, Result<Vec<String>, GuardError>> {
        let authors = self.authors.lock().unwrap_or_else(PoisonError::into_inner);
        let recent = authors
            .get(author_id)
            .filter(|a| a.last_post.elapsed() <= self.idle_ttl)
            .map(|a| a.posts.iter().take(limit).cloned().collect())
            .unwrap_or_default();
        futures::future::ready(Ok(recent)).boxed()
    }

    fn record(
        &self,
        author_id: &str,
        content: &str,
        depth: usize,
    ) -> BoxFuture<'_, Result<(), GuardError>> {
        let now = Instant::now();
        let mut authors = self.authors.lock().unwrap_or_else(PoisonError::into_inner);
        let author = authors
            .entry(author_id.to_string())
            .or_insert_with(|| AuthorPosts {
                posts: VecDeque::new(),
                last_post: now,
            });
        if now.duration_since(author.last_post) > self.idle_ttl {
            author.posts.clear();
        }
        author.last_post = now;
        author.posts.push_front(content.to_string());
        author.posts.truncate(depth.max(1));
        futures::future::ready(Ok(())).boxed()
    }

    fn sweep(&self) -> usize {
        let mut authors = self.authors.lock().unwrap_or_else(PoisonError::into_inner);
        let before = authors.len();
        authors.retain(|_, a| a.last_post.elapsed() <= self.idle_ttl);
        before - authors.len()
    }
}

/// Capped Redis list per author at `content:{author_id}`, expiring
/// `ttl` after the last write
pub struct RedisContentHistory {
    redis: ConnectionManager,
    ttl: Duration,
}

impl RedisContentHistory {
    pub fn new(redis: ConnectionManager, ttl: Duration) -> Self {
        Self { redis, ttl }
    }
}

impl ContentHistory for RedisContentHistory {
    fn recent(&self, author_id: &str, limit: usize) -> BoxFuture<'_, Result<Vec<String>, GuardError>> {
        let key = format!("{CONTENT_PREFIX}{author_id}");
        let mut conn = self.redis.clone();
        async move {
            if limit == 0 {
                return Ok(Vec::new());
            }
            let recent: Vec<String> = conn.lrange(&key, 0, limit as isize - 1).await?;
            Ok(recent)
        }
        .boxed()
    }

    fn record(
        &self,
        author_id: &str,
        content: &str,
        depth: usize,
    ) -> BoxFuture<'_, Result<(), GuardError>> {
        let key = format!("{CONTENT_PREFIX}{author_id}");
        let content = content.to_string();
        let ttl = self.ttl.as_secs().max(1) as i64;
        let mut conn = self.redis.clone();
        async move {
            let (): () = redis::pipe()
                .atomic()
                .lpush(&key, &content)
                .ignore()
                .ltrim(&key, 0, depth.max(1) as isize - 1)
                .ignore()
                .expire(&key, ttl)
                .ignore()
                .query_async(&mut conn)
                .await?;
            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);

    #[tokio::test]
    async fn test_memory_history_is_newest_first_and_capped() {
        let history = MemoryContentHistory::new(WEEK);
        for i in 0..5 {
            history.record("a", &format!("post {i}"), 3).await.unwrap();
        }
        history.record("b", "other author", 3).await.unwrap();

        let recent = history.recent("a", 10).await.unwrap();
        assert_eq!(recent, vec!["post 4", "post 3", "post 2"]);
        assert_eq!(history.recent("a", 1).await.unwrap(), vec!["post 4"]);
        assert!(history.recent("nobody", 10).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_authors_are_swept() {
        let history = MemoryContentHistory::new(Duration::from_secs(60));
        for i in 0..1_000 {
            history.record(&format!("drive-by-{i}"), "hello", 10).await.unwrap();
        }
        tokio::time::advance(Duration::from_secs(30)).await;
        history.record("regular", "still here", 10).await.unwrap();
        assert_eq!(history.len(), 1_001);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(history.recent("drive-by-0", 10).await.unwrap().is_empty());
        assert_eq!(history.sweep(), 1_000);
        assert_eq!(history.recent("regular", 10).await.unwrap(), vec!["still here"]);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(history.sweep(), 1);
        assert!(history.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_posting_after_idle_starts_fresh() {
        let history = MemoryContentHistory::new(Duration::from_secs(60));
        history.record("a", "old post", 10).await.unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;
        history.record("a", "new post", 10).await.unwrap();
        assert_eq!(history.recent("a", 10).await.unwrap(), vec!["new post"]);
    }
}
