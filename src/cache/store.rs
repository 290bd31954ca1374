//! Response cache storage with per-entry expiry.

use std::{sync::RwLock, time::Duration};

use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use tokio::time::Instant;
use tracing::debug;

use super::config::CacheConfig;
use super::keys::ResponseKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

pub const METRIC_CACHE_HIT: &str = "postboard_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "postboard_cache_miss_total";
pub const METRIC_CACHE_EXPIRED: &str = "postboard_cache_expired_total";

/// Cached HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

struct Entry {
    response: CachedResponse,
    expires_at: Instant,
}

/// Process-wide store of rendered responses.
///
/// Populated on miss, expired lazily on read once the TTL has elapsed, purged
/// wholesale by [`ResponseStore::clear`]. There is no per-entry invalidation.
pub struct ResponseStore {
    ttl: Duration,
    entries: RwLock<LruCache<ResponseKey, Entry>>,
}

impl ResponseStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            ttl: config.ttl(),
            entries: RwLock::new(LruCache::new(config.max_entries_non_zero())),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return a live entry, dropping it if its TTL has elapsed.
    pub fn get(&self, key: &ResponseKey) -> Option<CachedResponse> {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "get");

        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > now => {
                counter!(METRIC_CACHE_HIT).increment(1);
                return Some(entry.response.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(key);
            counter!(METRIC_CACHE_EXPIRED).increment(1);
            debug!(key = %key, "cached response expired");
        }
        counter!(METRIC_CACHE_MISS).increment(1);
        None
    }

    /// Store a response for one TTL, replacing any previous entry under `key`.
    pub fn set(&self, key: ResponseKey, response: CachedResponse) {
        let entry = Entry {
            response,
            expires_at: Instant::now() + self.ttl,
        };
        if let Some((evicted, _)) = rw_write(&self.entries, SOURCE, "set").push(key, entry) {
            debug!(key = %evicted, "cached response evicted");
        }
    }

    /// Purge every entry immediately, regardless of TTL.
    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }

    /// Number of stored entries, including ones whose TTL elapsed but were not read since.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
