//! Response cache configuration.

use std::{num::NonZeroUsize, time::Duration};

use serde::Deserialize;

const DEFAULT_TTL_SECONDS: u64 = 20;
const DEFAULT_MAX_ENTRIES: usize = 256;
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Serve the index feed through the response cache.
    pub enabled: bool,
    /// Lifetime of a cached response.
    pub ttl_seconds: u64,
    /// Upper bound on stored responses; least recently used entries are evicted.
    pub max_entries: usize,
    /// Responses with larger bodies are passed through uncached.
    pub max_body_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: DEFAULT_TTL_SECONDS,
            max_entries: DEFAULT_MAX_ENTRIES,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            ttl_seconds: settings.ttl.as_secs(),
            max_entries: settings.max_entries.get(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// Returns the entry limit as NonZeroUsize, clamping to 1 if zero.
    pub fn max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_entries).unwrap_or(NonZeroUsize::MIN)
    }
}
