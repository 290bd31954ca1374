//! Shared response cache.
//!
//! Rendered responses are stored process-wide under a key derived from the
//! request route. Entries live for a fixed TTL and are otherwise only removed by
//! an explicit [`ResponseStore::clear`]; writes to posts never invalidate them,
//! so a cached page may be stale for up to one TTL.
//!
//! ```toml
//! [cache]
//! enabled = true
//! ttl_seconds = 20
//! max_entries = 256
//! ```

mod config;
mod keys;
mod lock;
mod middleware;
mod store;

pub use config::CacheConfig;
pub use keys::ResponseKey;
pub use middleware::{CacheState, response_cache_layer};
pub use store::{
    CachedResponse, METRIC_CACHE_EXPIRED, METRIC_CACHE_HIT, METRIC_CACHE_MISS, ResponseStore,
};
