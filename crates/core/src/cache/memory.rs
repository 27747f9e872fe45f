//! In-memory [`ResultCache`].
//!
//! One shard per source, each behind its own mutex. The shard map lock is
//! only held long enough to find or create a shard.

use chrono::Duration;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::metrics::CACHE_LOOKUPS_TOTAL;
use crate::release::ReleaseInfo;

use super::{CacheEntry, CacheSettings, CacheStats, QuerySignature, ResultCache, SourceCacheStats};

#[derive(Debug, Default)]
struct SourceShard {
    entries: HashMap<QuerySignature, CacheEntry>,
    /// Insertion order, oldest first. Holds exactly the keys of `entries`.
    order: VecDeque<QuerySignature>,
}

impl SourceShard {
    fn remove(&mut self, signature: &QuerySignature) -> Option<CacheEntry> {
        let entry = self.entries.remove(signature)?;
        self.order.retain(|s| s != signature);
        Some(entry)
    }

    fn insert(&mut self, signature: QuerySignature, entry: CacheEntry, bound: usize) {
        self.remove(&signature);
        self.order.push_back(signature.clone());
        self.entries.insert(signature, entry);
        self.trim(bound);
    }

    fn trim(&mut self, bound: usize) {
        while self.order.len() > bound {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    fn result_count(&self) -> usize {
        self.entries.values().map(|e| e.results.len()).sum()
    }
}

type Shard = Arc<Mutex<SourceShard>>;

pub struct MemoryCache {
    shards: RwLock<HashMap<String, Shard>>,
    settings: RwLock<CacheSettings>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new(settings: CacheSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: CacheSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            shards: RwLock::new(HashMap::new()),
            settings: RwLock::new(settings),
            clock,
        }
    }

    fn shard(&self, source: &str) -> Option<Shard> {
        self.shards
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(source)
            .cloned()
    }

    fn shard_or_create(&self, source: &str) -> Shard {
        if let Some(shard) = self.shard(source) {
            return shard;
        }
        self.shards
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(source.to_string())
            .or_default()
            .clone()
    }

    fn all_shards(&self) -> Vec<(String, Shard)> {
        self.shards
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, shard)| (id.clone(), shard.clone()))
            .collect()
    }
}

fn lock(shard: &Shard) -> std::sync::MutexGuard<'_, SourceShard> {
    shard.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ResultCache for MemoryCache {
    fn get(&self, source: &str, signature: &QuerySignature) -> Option<CacheEntry> {
        let now = self.clock.now();
        let hit = self.shard(source).and_then(|shard| {
            let mut shard = lock(&shard);
            match shard.entries.get(signature) {
                Some(entry) if entry.is_expired(now) => {
                    shard.remove(signature);
                    None
                }
                Some(entry) => Some(entry.clone()),
                None => None,
            }
        });

        let result = if hit.is_some() { "hit" } else { "miss" };
        CACHE_LOOKUPS_TOTAL.with_label_values(&[result]).inc();
        debug!(source, signature = %signature, result, "Cache lookup");
        hit
    }

    fn put(
        &self,
        source: &str,
        signature: QuerySignature,
        results: Vec<ReleaseInfo>,
        ttl: Option<Duration>,
    ) {
        let settings = self.settings();
        let entry = CacheEntry {
            results: Arc::new(results),
            inserted_at: self.clock.now(),
            ttl: ttl.unwrap_or(settings.ttl),
        };
        let shard = self.shard_or_create(source);
        lock(&shard).insert(signature, entry, settings.max_entries_per_source);
    }

    fn invalidate(&self, source: &str, signature: &QuerySignature) -> bool {
        self.shard(source)
            .is_some_and(|shard| lock(&shard).remove(signature).is_some())
    }

    fn invalidate_source(&self, source: &str) -> usize {
        let removed = self
            .shards
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(source);
        removed.map_or(0, |shard| lock(&shard).entries.len())
    }

    fn configure(&self, settings: CacheSettings) {
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = settings;
        for (_, shard) in self.all_shards() {
            lock(&shard).trim(settings.max_entries_per_source);
        }
    }

    fn settings(&self) -> CacheSettings {
        *self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn prune_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        for (_, shard) in self.all_shards() {
            let mut shard = lock(&shard);
            let expired: Vec<QuerySignature> = shard
                .entries
                .iter()
                .filter(|(_, entry)| entry.is_expired(now))
                .map(|(sig, _)| sig.clone())
                .collect();
            for signature in expired {
                shard.remove(&signature);
                removed += 1;
            }
        }
        removed
    }

    fn clear(&self) {
        self.shards
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn stats(&self) -> CacheStats {
        let settings = self.settings();
        let mut sources: Vec<SourceCacheStats> = self
            .all_shards()
            .into_iter()
            .map(|(source, shard)| {
                let shard = lock(&shard);
                SourceCacheStats {
                    source,
                    entries: shard.entries.len(),
                    results: shard.result_count(),
                }
            })
            .filter(|s| s.entries > 0)
            .collect();
        sources.sort_by(|a, b| a.source.cmp(&b.source));

        CacheStats {
            ttl_secs: settings.ttl.num_seconds(),
            max_entries_per_source: settings.max_entries_per_source,
            total_entries: sources.iter().map(|s| s.entries).sum(),
            total_results: sources.iter().map(|s| s.results).sum(),
            sources,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{QueryTerms, SearchMode, SourceRequest};
    use crate::testing::{sample_release, ManualClock};

    fn signature(text: &str) -> QuerySignature {
        QuerySignature::of(&SourceRequest {
            mode: SearchMode::Search,
            terms: QueryTerms::text(text),
            categories: vec![],
        })
    }

    fn cache(clock: Arc<ManualClock>, ttl_secs: i64, bound: usize) -> MemoryCache {
        MemoryCache::with_clock(
            CacheSettings {
                ttl: Duration::seconds(ttl_secs),
                max_entries_per_source: bound,
            },
            clock,
        )
    }

    #[test]
    fn test_ttl_boundary() {
        let clock = Arc::new(ManualClock::default());
        let cache = cache(clock.clone(), 2100, 1000);
        cache.put("a", signature("x"), vec![sample_release("a", "one")], None);

        clock.advance(Duration::seconds(2099));
        assert!(cache.get("a", &signature("x")).is_some());

        clock.advance(Duration::seconds(1));
        assert!(cache.get("a", &signature("x")).is_some(), "edge is a hit");

        clock.advance(Duration::seconds(1));
        assert!(cache.get("a", &signature("x")).is_none());
        // expired entry is dropped on the miss
        assert_eq!(cache.stats().total_entries, 0);
    }

    #[test]
    fn test_fifo_eviction() {
        let clock = Arc::new(ManualClock::default());
        let cache = cache(clock, 2100, 3);
        for q in ["one", "two", "three", "four"] {
            cache.put("a", signature(q), vec![], None);
        }

        assert!(cache.get("a", &signature("one")).is_none());
        for q in ["two", "three", "four"] {
            assert!(cache.get("a", &signature(q)).is_some(), "{} should be cached", q);
        }
    }

    #[test]
    fn test_reput_counts_as_fresh_insertion() {
        let clock = Arc::new(ManualClock::default());
        let cache = cache(clock, 2100, 2);
        cache.put("a", signature("one"), vec![], None);
        cache.put("a", signature("two"), vec![], None);
        cache.put("a", signature("one"), vec![sample_release("a", "newer")], None);
        cache.put("a", signature("three"), vec![], None);

        let one = cache.get("a", &signature("one")).unwrap();
        assert_eq!(one.results[0].title, "newer");
        assert!(cache.get("a", &signature("two")).is_none());
    }

    #[test]
    fn test_bound_is_per_source() {
        let clock = Arc::new(ManualClock::default());
        let cache = cache(clock, 2100, 1);
        cache.put("a", signature("x"), vec![], None);
        cache.put("b", signature("x"), vec![], None);
        assert!(cache.get("a", &signature("x")).is_some());
        assert!(cache.get("b", &signature("x")).is_some());
    }

    #[test]
    fn test_explicit_ttl_overrides_default() {
        let clock = Arc::new(ManualClock::default());
        let cache = cache(clock.clone(), 2100, 10);
        cache.put("a", signature("x"), vec![], Some(Duration::seconds(10)));
        clock.advance(Duration::seconds(11));
        assert!(cache.get("a", &signature("x")).is_none());
    }

    #[test]
    fn test_invalidate() {
        let clock = Arc::new(ManualClock::default());
        let cache = cache(clock, 2100, 10);
        cache.put("a", signature("x"), vec![], None);
        cache.put("a", signature("y"), vec![], None);

        assert!(cache.invalidate("a", &signature("x")));
        assert!(!cache.invalidate("a", &signature("x")));
        assert!(!cache.invalidate("missing", &signature("x")));
        assert_eq!(cache.invalidate_source("a"), 1);
        assert_eq!(cache.stats().total_entries, 0);
    }

    #[test]
    fn test_configure_trims_shards() {
        let clock = Arc::new(ManualClock::default());
        let cache = cache(clock, 2100, 10);
        for q in ["one", "two", "three"] {
            cache.put("a", signature(q), vec![], None);
        }
        cache.configure(CacheSettings {
            ttl: Duration::seconds(60),
            max_entries_per_source: 1,
        });

        assert_eq!(cache.settings().ttl, Duration::seconds(60));
        assert!(cache.get("a", &signature("three")).is_some());
        assert!(cache.get("a", &signature("two")).is_none());
    }

    #[test]
    fn test_prune_and_stats() {
        let clock = Arc::new(ManualClock::default());
        let cache = cache(clock.clone(), 100, 10);
        cache.put("a", signature("old"), vec![sample_release("a", "1")], None);
        clock.advance(Duration::seconds(50));
        cache.put(
            "b",
            signature("new"),
            vec![sample_release("b", "1"), sample_release("b", "2")],
            None,
        );
        clock.advance(Duration::seconds(60));

        assert_eq!(cache.prune_expired(), 1);
        let stats = cache.stats();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.total_results, 2);
        assert_eq!(stats.sources[0].source, "b");

        cache.clear();
        assert_eq!(cache.stats().total_entries, 0);
    }
}
