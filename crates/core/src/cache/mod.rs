//! Per-source result cache.

mod memory;
mod types;

pub use memory::MemoryCache;
pub use types::{CacheEntry, CacheSettings, CacheStats, QuerySignature, SourceCacheStats};

use chrono::Duration;

use crate::release::ReleaseInfo;

/// Store of normalized results keyed by `(source id, signature)`.
pub trait ResultCache: Send + Sync {
    /// Fresh entry for the key, if any.
    fn get(&self, source: &str, signature: &QuerySignature) -> Option<CacheEntry>;

    /// Insert or replace an entry. `ttl` defaults to the configured TTL.
    fn put(
        &self,
        source: &str,
        signature: QuerySignature,
        results: Vec<ReleaseInfo>,
        ttl: Option<Duration>,
    );

    /// Drop one entry. Returns whether it existed.
    fn invalidate(&self, source: &str, signature: &QuerySignature) -> bool;

    /// Drop every entry of a source. Returns how many were removed.
    fn invalidate_source(&self, source: &str) -> usize;

    /// Change the default TTL and per-source bound. Shards over the new bound
    /// are trimmed immediately.
    fn configure(&self, settings: CacheSettings);

    fn settings(&self) -> CacheSettings;

    /// Remove expired entries. Returns how many were removed.
    fn prune_expired(&self) -> usize;

    fn clear(&self);

    fn stats(&self) -> CacheStats;
}
