//! In-memory API cache with TTL and capacity bounds.

use super::traits::{ApiCache, CacheConfig, CachedResponse};
use mini_moka::sync::Cache;
use tracing::debug;

/// [`ApiCache`] backed by a `mini_moka` TTL cache.
#[derive(Clone)]
pub struct MemoryApiCache {
    entries: Cache<String, CachedResponse>,
}

impl MemoryApiCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: Cache::builder()
                .time_to_live(config.ttl)
                .max_capacity(config.max_entries)
                .build(),
        }
    }
}

impl Default for MemoryApiCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl std::fmt::Debug for MemoryApiCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryApiCache").finish_non_exhaustive()
    }
}

impl ApiCache for MemoryApiCache {
    fn get(&self, key: &str) -> Option<CachedResponse> {
        self.entries.get(&key.to_string())
    }

    fn insert(&self, key: &str, response: CachedResponse) {
        self.entries.insert(key.to_string(), response);
    }

    fn invalidate(&self, key: &str) {
        self.entries.invalidate(&key.to_string());
    }

    fn force_clear(&self) {
        debug!("Force-clearing API response cache");
        self.entries.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_insert_then_get() {
        let cache = MemoryApiCache::default();
        cache.insert("/api/locations", CachedResponse::new(200, b"[]".to_vec()));

        let hit = cache.get("/api/locations").unwrap();
        assert_eq!(hit.status, 200);
        assert_eq!(hit.body, b"[]");
        assert!(cache.get("/api/supplies").is_none());
    }

    #[test]
    fn test_invalidate_single_key() {
        let cache = MemoryApiCache::default();
        cache.insert("a", CachedResponse::new(200, vec![1]));
        cache.insert("b", CachedResponse::new(200, vec![2]));

        cache.invalidate("a");

        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
    }

    #[test]
    fn test_force_clear_drops_everything() {
        let cache = MemoryApiCache::default();
        for key in ["/api/blog", "/api/testimonials", "/api/referrals"] {
            cache.insert(key, CachedResponse::new(200, key.as_bytes().to_vec()));
        }

        cache.force_clear();

        assert!(cache.get("/api/blog").is_none());
        assert!(cache.get("/api/testimonials").is_none());
        assert!(cache.get("/api/referrals").is_none());
    }

    #[test]
    fn test_entries_expire_after_ttl() {
        let cache = MemoryApiCache::new(&CacheConfig::default().with_ttl(Duration::from_millis(20)));
        cache.insert("short", CachedResponse::new(200, vec![]));
        std::thread::sleep(Duration::from_millis(60));
        assert!(cache.get("short").is_none());
    }
}
