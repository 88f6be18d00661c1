//! API response cache.
//!
//! The offline monitor force-clears this store when connectivity is lost so
//! stale responses are never served across an outage.

mod memory;
mod traits;

pub use memory::MemoryApiCache;
pub use traits::{ApiCache, CacheConfig, CachedResponse};
