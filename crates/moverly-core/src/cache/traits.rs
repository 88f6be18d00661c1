//! API cache trait and types.

use crate::config::SessionConfig;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Configuration for the in-memory API response cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long a cached response stays valid.
    pub ttl: Duration,
    /// Maximum number of cached responses.
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: SessionConfig::CACHE_TTL,
            max_entries: SessionConfig::CACHE_MAX_ENTRIES,
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_max_entries(mut self, max_entries: u64) -> Self {
        self.max_entries = max_entries;
        self
    }
}

/// A previously fetched API response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    /// HTTP status the backend answered with.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
    /// When the response was stored.
    pub cached_at: DateTime<Utc>,
}

impl CachedResponse {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            body,
            cached_at: Utc::now(),
        }
    }
}

/// Key-value store of prior API responses, shared by every request path.
///
/// Clearing is a single drop-all operation, so concurrent readers racing a
/// clear at worst re-fetch once.
pub trait ApiCache: Send + Sync {
    /// Get a cached response. Returns `None` if absent or expired.
    fn get(&self, key: &str) -> Option<CachedResponse>;

    /// Store a response, replacing any previous entry for the key.
    fn insert(&self, key: &str, response: CachedResponse);

    /// Drop one entry.
    fn invalidate(&self, key: &str);

    /// Unconditionally remove every entry.
    fn force_clear(&self);
}
