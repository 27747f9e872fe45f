//! Source registry and health tracking.
//!
//! The id -> entry map is copy-on-write: readers clone an `Arc` of the whole
//! map under a short read lock, and [`SourceRegistry::reload`] swaps in a new
//! map. Each entry carries its own health lock.

mod caps;
mod health;
mod types;

pub use caps::{CapsCategory, ModeCaps, TorznabCaps, CAPS_LIMIT_DEFAULT, CAPS_LIMIT_MAX};
pub use health::{derive_status, HealthState, SourceStatus, TestResult};
pub use types::{SourceDescriptor, SourceKind};

use chrono::Duration;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use thiserror::Error;
use tracing::{debug, info};

use crate::category::CategoryError;
use crate::clock::Clock;
use crate::source::Source;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Source not found: {0}")]
    NotFound(String),

    #[error("Source already registered: {0}")]
    Duplicate(String),

    #[error("Source '{id}' has an invalid category table: {source}")]
    Category {
        id: String,
        #[source]
        source: CategoryError,
    },
}

struct RegistryEntry {
    descriptor: Arc<SourceDescriptor>,
    adapter: Arc<dyn Source>,
    /// Shared with the replacement entry when a reload keeps this id.
    health: Arc<Mutex<HealthState>>,
}

type EntryMap = BTreeMap<String, Arc<RegistryEntry>>;

/// Point-in-time view of one source.
#[derive(Clone)]
pub struct SourceSnapshot {
    pub descriptor: Arc<SourceDescriptor>,
    pub adapter: Arc<dyn Source>,
    pub health: HealthState,
    pub status: SourceStatus,
}

impl SourceSnapshot {
    pub fn id(&self) -> &str {
        &self.descriptor.id
    }
}

impl fmt::Debug for SourceSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceSnapshot")
            .field("descriptor", &self.descriptor)
            .field("health", &self.health)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// All known sources, keyed by id.
pub struct SourceRegistry {
    entries: RwLock<Arc<EntryMap>>,
    clock: Arc<dyn Clock>,
    window: Duration,
}

impl SourceRegistry {
    pub fn new(clock: Arc<dyn Clock>, window: Duration) -> Self {
        Self {
            entries: RwLock::new(Arc::new(BTreeMap::new())),
            clock,
            window,
        }
    }

    /// Build a registry holding `sources`.
    pub fn with_sources(
        sources: Vec<(Arc<dyn Source>, bool)>,
        clock: Arc<dyn Clock>,
        window: Duration,
    ) -> Result<Self, RegistryError> {
        let registry = Self::new(clock, window);
        registry.reload(sources)?;
        Ok(registry)
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn current(&self) -> Arc<EntryMap> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn entry(&self, id: &str) -> Result<Arc<RegistryEntry>, RegistryError> {
        self.current()
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Add one source. Fails if the id is already taken.
    pub fn register(&self, adapter: Arc<dyn Source>, configured: bool) -> Result<(), RegistryError> {
        let entry = build_entry(adapter, configured, None)?;
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if guard.contains_key(&entry.descriptor.id) {
            return Err(RegistryError::Duplicate(entry.descriptor.id.clone()));
        }
        let mut next = EntryMap::clone(&guard);
        info!(source = %entry.descriptor.id, configured, "Registered source");
        next.insert(entry.descriptor.id.clone(), Arc::new(entry));
        *guard = Arc::new(next);
        Ok(())
    }

    /// Replace the whole source set.
    ///
    /// Health survives for ids present before and after. Snapshots already
    /// handed out are unaffected. Returns the ids that were removed.
    pub fn reload(&self, sources: Vec<(Arc<dyn Source>, bool)>) -> Result<Vec<String>, RegistryError> {
        let mut built = Vec::with_capacity(sources.len());
        for (adapter, configured) in sources {
            if built.iter().any(|e: &RegistryEntry| e.descriptor.id == adapter.id()) {
                return Err(RegistryError::Duplicate(adapter.id().to_string()));
            }
            built.push(build_entry(adapter, configured, None)?);
        }

        // read, carry health and swap under one guard
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = EntryMap::new();
        for mut entry in built {
            if let Some(previous) = guard.get(&entry.descriptor.id) {
                entry.health = previous.health.clone();
            }
            next.insert(entry.descriptor.id.clone(), Arc::new(entry));
        }

        let removed: Vec<String> = guard
            .keys()
            .filter(|id| !next.contains_key(*id))
            .cloned()
            .collect();

        *guard = Arc::new(next);
        debug!(removed = ?removed, "Registry reloaded");
        Ok(removed)
    }

    /// Every source, ordered by id.
    pub fn list(&self) -> Vec<SourceSnapshot> {
        let now = self.clock.now();
        self.current()
            .values()
            .map(|entry| self.snapshot(entry, now))
            .collect()
    }

    pub fn get(&self, id: &str) -> Result<SourceSnapshot, RegistryError> {
        let entry = self.entry(id)?;
        Ok(self.snapshot(&entry, self.clock.now()))
    }

    pub fn len(&self) -> usize {
        self.current().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current().is_empty()
    }

    /// Record the outcome of a live query.
    pub fn record_outcome(&self, id: &str, outcome: Result<(), String>) -> Result<(), RegistryError> {
        let entry = self.entry(id)?;
        let now = self.clock.now();
        let mut health = entry.health.lock().unwrap_or_else(PoisonError::into_inner);
        match outcome {
            Ok(()) => health.record_success(now),
            Err(error) => health.record_failure(now, error),
        }
        Ok(())
    }

    /// Record the result of an explicit source test.
    pub fn record_test(&self, id: &str, passed: bool) -> Result<(), RegistryError> {
        let entry = self.entry(id)?;
        let now = self.clock.now();
        entry
            .health
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record_test(now, passed);
        Ok(())
    }

    fn snapshot(&self, entry: &RegistryEntry, now: chrono::DateTime<chrono::Utc>) -> SourceSnapshot {
        let health = entry
            .health
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let status = derive_status(now, &health, self.window);
        SourceSnapshot {
            descriptor: entry.descriptor.clone(),
            adapter: entry.adapter.clone(),
            health,
            status,
        }
    }
}

fn build_entry(
    adapter: Arc<dyn Source>,
    configured: bool,
    health: Option<Arc<Mutex<HealthState>>>,
) -> Result<RegistryEntry, RegistryError> {
    let descriptor =
        SourceDescriptor::from_source(adapter.as_ref(), configured).map_err(|source| {
            RegistryError::Category {
                id: adapter.id().to_string(),
                source,
            }
        })?;
    Ok(RegistryEntry {
        descriptor: Arc::new(descriptor),
        adapter,
        health: health.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::CategoryMapping;
    use crate::testing::{ManualClock, MockSource};

    fn registry(clock: Arc<ManualClock>) -> SourceRegistry {
        SourceRegistry::new(clock, Duration::seconds(86_400))
    }

    fn source(id: &str) -> Arc<dyn Source> {
        Arc::new(MockSource::new(id))
    }

    #[test]
    fn test_list_is_ordered_by_id() {
        let registry = registry(Arc::new(ManualClock::default()));
        registry.register(source("charlie"), true).unwrap();
        registry.register(source("alpha"), true).unwrap();
        registry.register(source("bravo"), false).unwrap();

        let ids: Vec<String> = registry.list().iter().map(|s| s.id().to_string()).collect();
        assert_eq!(ids, vec!["alpha", "bravo", "charlie"]);
        assert!(!registry.get("bravo").unwrap().descriptor.configured);
    }

    #[test]
    fn test_register_duplicate_fails() {
        let registry = registry(Arc::new(ManualClock::default()));
        registry.register(source("alpha"), true).unwrap();
        assert!(matches!(
            registry.register(source("alpha"), true),
            Err(RegistryError::Duplicate(_))
        ));
    }

    #[test]
    fn test_register_rejects_bad_categories() {
        let registry = registry(Arc::new(ManualClock::default()));
        let bad = MockSource::new("bad").with_categories(vec![CategoryMapping::new(1, vec![42])]);
        assert!(matches!(
            registry.register(Arc::new(bad), true),
            Err(RegistryError::Category { .. })
        ));
    }

    #[test]
    fn test_get_unknown() {
        let registry = registry(Arc::new(ManualClock::default()));
        assert!(matches!(registry.get("nope"), Err(RegistryError::NotFound(_))));
        assert!(registry.record_outcome("nope", Ok(())).is_err());
    }

    #[test]
    fn test_record_outcome_drives_status() {
        let clock = Arc::new(ManualClock::default());
        let registry = registry(clock.clone());
        registry.register(source("alpha"), true).unwrap();
        assert_eq!(registry.get("alpha").unwrap().status, SourceStatus::Unknown);

        registry.record_outcome("alpha", Ok(())).unwrap();
        assert_eq!(registry.get("alpha").unwrap().status, SourceStatus::Healthy);

        clock.advance(Duration::seconds(5));
        registry
            .record_outcome("alpha", Err("timeout".to_string()))
            .unwrap();
        let snapshot = registry.get("alpha").unwrap();
        assert_eq!(snapshot.status, SourceStatus::Failing);
        assert_eq!(snapshot.health.last_error.as_deref(), Some("timeout"));

        clock.advance(Duration::seconds(86_401));
        assert_eq!(registry.get("alpha").unwrap().status, SourceStatus::Unknown);
    }

    #[test]
    fn test_record_test() {
        let registry = registry(Arc::new(ManualClock::default()));
        registry.register(source("alpha"), true).unwrap();
        registry.record_test("alpha", false).unwrap();
        let snapshot = registry.get("alpha").unwrap();
        assert_eq!(snapshot.health.last_test_result, TestResult::Failed);
        assert!(snapshot.health.last_test_at.is_some());
    }

    #[test]
    fn test_reload_keeps_health_for_surviving_ids() {
        let registry = registry(Arc::new(ManualClock::default()));
        registry
            .reload(vec![(source("alpha"), true), (source("bravo"), true)])
            .unwrap();
        registry
            .record_outcome("alpha", Err("down".to_string()))
            .unwrap();
        registry.record_outcome("bravo", Ok(())).unwrap();

        let removed = registry
            .reload(vec![(source("alpha"), true), (source("delta"), true)])
            .unwrap();
        assert_eq!(removed, vec!["bravo".to_string()]);

        assert_eq!(registry.get("alpha").unwrap().status, SourceStatus::Failing);
        assert_eq!(registry.get("delta").unwrap().status, SourceStatus::Unknown);
        assert!(registry.get("bravo").is_err());
    }

    #[test]
    fn test_snapshot_survives_reload() {
        let registry = registry(Arc::new(ManualClock::default()));
        registry.reload(vec![(source("alpha"), true)]).unwrap();
        let held = registry.list();

        registry.reload(vec![]).unwrap();
        assert!(registry.is_empty());
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].id(), "alpha");
    }

    #[test]
    fn test_concurrent_register_is_kept_or_reported_removed() {
        let registry = registry(Arc::new(ManualClock::default()));
        registry.reload(vec![(source("alpha"), true)]).unwrap();

        for n in 0..200 {
            let id = format!("late-{}", n);
            let removed = std::thread::scope(|scope| {
                let adder = scope.spawn(|| registry.register(source(&id), true).unwrap());
                let reloader = scope.spawn(|| registry.reload(vec![(source("alpha"), true)]).unwrap());
                adder.join().unwrap();
                reloader.join().unwrap()
            });
            // the registered id either survived or was swapped out by the reload
            assert!(
                registry.get(&id).is_ok() || removed.contains(&id),
                "{} vanished without being reported",
                id
            );
        }
        assert!(registry.get("alpha").is_ok());
    }

    #[test]
    fn test_reload_rejects_duplicate_ids() {
        let registry = registry(Arc::new(ManualClock::default()));
        registry.reload(vec![(source("alpha"), true)]).unwrap();
        let result = registry.reload(vec![(source("x"), true), (source("x"), false)]);
        assert!(matches!(result, Err(RegistryError::Duplicate(_))));
        // failed reload leaves the previous set in place
        assert_eq!(registry.len(), 1);
    }
}
