//! Brush stamp cache.
//!
//! Decoded stamp bitmaps are kept in a bounded LRU keyed by URL. Concurrent
//! requests for the same uncached URL share one in-flight load. The loads
//! themselves run on spawned tasks, so a load always finishes (and clears its
//! in-flight marker) even if every caller stops waiting for it.
//!
//! The cache state is only touched under a synchronous lock at call entry
//! and at load completion; the lock is never held across an await.
//!
//! Loading therefore needs a Tokio runtime. The synchronous accessors
//! (`get_stamp_sync`, `clear_stamp_cache`, `len`) work from any thread.

use futures::FutureExt;
use futures::future::{BoxFuture, Shared, join_all};
use image::RgbaImage;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Maximum decoded stamps kept in memory
pub const STAMP_CACHE_CAPACITY: usize = 32;

/// A decoded stamp, shared between the cache and brush renderers
pub type Stamp = Arc<RgbaImage>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StampError {
    #[error("failed to read stamp {url}: {message}")]
    Io { url: String, message: String },

    #[error("failed to decode stamp {url}: {message}")]
    Decode { url: String, message: String },

    #[error("stamp load for {url} did not complete: {message}")]
    Task { url: String, message: String },
}

/// Fetches and decodes a stamp image
pub trait StampLoader: Send + Sync + 'static {
    fn load(&self, url: &str) -> BoxFuture<'static, Result<RgbaImage, StampError>>;
}

/// Loads stamps from a directory, treating URLs as paths relative to it
pub struct FileStampLoader {
    root: PathBuf,
}

impl FileStampLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl StampLoader for FileStampLoader {
    fn load(&self, url: &str) -> BoxFuture<'static, Result<RgbaImage, StampError>> {
        let path = self.root.join(url.trim_start_matches('/'));
        let url = url.to_string();

        async move {
            let bytes = tokio::fs::read(&path).await.map_err(|e| StampError::Io {
                url: url.clone(),
                message: e.to_string(),
            })?;

            let decode_url = url.clone();
            tokio::task::spawn_blocking(move || decode_stamp(&decode_url, &bytes))
                .await
                .map_err(|e| StampError::Task {
                    url,
                    message: e.to_string(),
                })?
        }
        .boxed()
    }
}

/// Decode raw image bytes into an RGBA bitmap
pub fn decode_stamp(url: &str, bytes: &[u8]) -> Result<RgbaImage, StampError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| StampError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
}

type PendingLoad = Shared<BoxFuture<'static, Result<Stamp, StampError>>>;

struct CacheEntry {
    image: Stamp,
    last_accessed: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    pending: HashMap<String, PendingLoad>,
    /// Monotonic access counter driving LRU order
    counter: u64,
    /// Bumped by `clear` so loads started earlier do not repopulate
    generation: u64,
}

impl CacheState {
    fn touch(&mut self, url: &str) -> Option<Stamp> {
        let entry = self.entries.get_mut(url)?;
        self.counter += 1;
        entry.last_accessed = self.counter;
        Some(Arc::clone(&entry.image))
    }

    fn insert(&mut self, url: String, image: Stamp, capacity: usize) {
        if !self.entries.contains_key(&url) && self.entries.len() >= capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                self.entries.remove(&oldest);
                tracing::trace!(url = %oldest, "Evicted stamp");
            }
        }

        self.counter += 1;
        self.entries.insert(
            url,
            CacheEntry {
                image,
                last_accessed: self.counter,
            },
        );
    }
}

fn lock(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Deduplicating LRU cache of decoded brush stamps
///
/// `load_stamp` and `preload_stamps` spawn their loads onto the ambient
/// Tokio runtime and must be awaited from within one.
pub struct StampCache<L> {
    loader: Arc<L>,
    state: Arc<Mutex<CacheState>>,
    capacity: usize,
}

impl<L: StampLoader> StampCache<L> {
    pub fn new(loader: L) -> Self {
        Self::with_capacity(loader, STAMP_CACHE_CAPACITY)
    }

    pub fn with_capacity(loader: L, capacity: usize) -> Self {
        Self {
            loader: Arc::new(loader),
            state: Arc::new(Mutex::new(CacheState::default())),
            capacity: capacity.max(1),
        }
    }

    /// Return the stamp for `url`, loading it if needed.
    ///
    /// Callers racing on the same uncached URL all await one load.
    ///
    /// # Panics
    ///
    /// Panics if a load has to start outside a Tokio runtime. Cache hits and
    /// joins onto an in-flight load never spawn.
    pub async fn load_stamp(&self, url: &str) -> Result<Stamp, StampError> {
        let pending = {
            let mut state = lock(&self.state);
            if let Some(image) = state.touch(url) {
                return Ok(image);
            }
            match state.pending.get(url) {
                Some(pending) => pending.clone(),
                None => {
                    let pending = self.start_load(&mut state, url);
                    state.pending.insert(url.to_string(), pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    fn start_load(&self, state: &mut CacheState, url: &str) -> PendingLoad {
        let generation = state.generation;
        let capacity = self.capacity;
        let fetch = self.loader.load(url);
        let key = url.to_string();

        let task_state = Arc::clone(&self.state);
        let task = tokio::spawn(async move {
            let result = fetch.await.map(Arc::new);

            let mut state = lock(&task_state);
            if state.generation == generation {
                state.pending.remove(&key);
                match &result {
                    Ok(image) => state.insert(key.clone(), Arc::clone(image), capacity),
                    Err(e) => tracing::warn!(url = %key, error = %e, "Stamp load failed"),
                }
            }
            result
        });

        let join_state = Arc::clone(&self.state);
        let url = url.to_string();
        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    let mut state = lock(&join_state);
                    if state.generation == generation {
                        state.pending.remove(&url);
                    }
                    Err(StampError::Task {
                        url,
                        message: e.to_string(),
                    })
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Cached stamp for `url`, never starting a load
    pub fn get_stamp_sync(&self, url: &str) -> Option<Stamp> {
        lock(&self.state).touch(url)
    }

    /// Warm the cache with `urls` concurrently; failures are logged and
    /// skipped. Returns how many stamps are now available.
    pub async fn preload_stamps<S: AsRef<str>>(&self, urls: &[S]) -> usize {
        let results = join_all(urls.iter().map(|url| self.load_stamp(url.as_ref()))).await;

        let loaded = results.iter().filter(|r| r.is_ok()).count();
        if loaded < results.len() {
            tracing::debug!(
                requested = results.len(),
                loaded = loaded,
                "Stamp preload partially failed"
            );
        }
        loaded
    }

    /// Drop every cached and in-flight stamp
    pub fn clear_stamp_cache(&self) {
        let mut state = lock(&self.state);
        state.entries.clear();
        state.pending.clear();
        state.counter = 0;
        state.generation += 1;
    }

    pub fn len(&self) -> usize {
        lock(&self.state).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of loads currently in flight
    pub fn pending(&self) -> usize {
        lock(&self.state).pending.len()
    }
}
