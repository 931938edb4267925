//! In-memory cache manager keyed by ticker symbol
//!
//! Provides a `MemoryCache` that pairs each value with the instant it was
//! stored. Staleness is judged lazily on read; entries are only replaced on
//! insert or dropped by an explicit invalidation.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Default freshness window (15 minutes)
pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(15 * 60);

/// A stored value with its timestamps
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    /// The cached data
    data: T,
    /// Monotonic instant used for freshness checks
    stored_at: Instant,
    /// Wall-clock time the data was cached
    cached_at: DateTime<Utc>,
}

/// Result of peeking into the cache, including metadata about freshness
#[derive(Debug, Clone)]
pub struct CachedData<T> {
    /// The cached data
    pub data: T,
    /// When the data was originally cached
    pub cached_at: DateTime<Utc>,
    /// Whether the entry is older than the freshness window
    pub is_expired: bool,
}

/// Manages cached values for one kind of data
///
/// Each client owns its caches, so tests get a fresh, isolated cache per case.
#[derive(Debug)]
pub struct MemoryCache<T> {
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
    freshness: Duration,
}

impl<T: Clone> MemoryCache<T> {
    /// Creates an empty cache with the default 15 minute window
    pub fn new() -> Self {
        Self::with_freshness(DEFAULT_FRESHNESS)
    }

    /// Creates an empty cache with a custom freshness window
    pub fn with_freshness(freshness: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            freshness,
        }
    }

    /// Returns the freshness window
    pub fn freshness(&self) -> Duration {
        self.freshness
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_fresh(&self, entry: &CacheEntry<T>, now: Instant) -> bool {
        now.saturating_duration_since(entry.stored_at) < self.freshness
    }

    /// Returns the value for `key` if it is still within the freshness window
    ///
    /// Reading never mutates the cache; a stale entry stays until it is
    /// overwritten or invalidated.
    pub fn get_fresh(&self, key: &str) -> Option<T> {
        let now = Instant::now();
        self.entries()
            .get(key)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| entry.data.clone())
    }

    /// Returns the entry for `key` regardless of age
    pub fn peek(&self, key: &str) -> Option<CachedData<T>> {
        let now = Instant::now();
        self.entries().get(key).map(|entry| CachedData {
            data: entry.data.clone(),
            cached_at: entry.cached_at,
            is_expired: !self.is_fresh(entry, now),
        })
    }

    /// Stores `data` under `key`, replacing any previous entry
    pub fn insert(&self, key: impl Into<String>, data: T) {
        let entry = CacheEntry {
            data,
            stored_at: Instant::now(),
            cached_at: Utc::now(),
        };
        self.entries().insert(key.into(), entry);
    }

    /// Removes the entry for `key`, returning whether one existed
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries().remove(key).is_some()
    }

    /// Number of stored entries, fresh or not
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Drops every entry
    pub fn clear(&self) {
        self.entries().clear();
    }
}

impl<T: Clone> Default for MemoryCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
