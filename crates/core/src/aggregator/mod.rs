//! Aggregation coordinator.
//!
//! Resolves a scope to a set of sources, fans the query out with bounded
//! concurrency, consults the cache, normalizes results and merges them.
//! A failing source only contributes an error record.

mod types;

pub use types::*;

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::cache::{QuerySignature, ResultCache};
use crate::category::strip_custom;
use crate::config::AggregatorConfig;
use crate::metrics::{
    AGGREGATE_RESULTS, FILTER_REJECTIONS_TOTAL, SOURCE_QUERIES_TOTAL, SOURCE_QUERY_DURATION,
};
use crate::registry::{RegistryError, SourceRegistry, SourceSnapshot, TorznabCaps};
use crate::release::ReleaseInfo;
use crate::source::{Source, SourceError, SourceRequest};

/// Everything one unit of a fan-out produced.
struct UnitOutcome {
    position: usize,
    releases: Vec<ReleaseInfo>,
    report: Option<SourceReport>,
    failure: Option<SourceFailure>,
}

pub struct Aggregator {
    registry: Arc<SourceRegistry>,
    cache: Arc<dyn ResultCache>,
    config: AggregatorConfig,
}

impl Aggregator {
    pub fn new(
        registry: Arc<SourceRegistry>,
        cache: Arc<dyn ResultCache>,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            registry,
            cache,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<dyn ResultCache> {
        &self.cache
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    fn parse_scope(&self, raw: &str) -> Result<Scope, AggregateError> {
        Scope::parse(raw).map_err(|e| {
            FILTER_REJECTIONS_TOTAL.inc();
            debug!(scope = raw, phase = ?QueryPhase::Rejected, error = %e, "Filter rejected");
            AggregateError::from(e)
        })
    }

    /// Sources a scope selects, ordered by id.
    ///
    /// Searches only ever see configured sources. With
    /// `include_unconfigured`, `all` and filter scopes range over every
    /// registered source and an explicit id may name an unconfigured one.
    pub fn resolve(
        &self,
        scope: &Scope,
        include_unconfigured: bool,
    ) -> Result<Vec<SourceSnapshot>, AggregateError> {
        let eligible = |s: &SourceSnapshot| include_unconfigured || s.descriptor.configured;
        match scope {
            Scope::Source(id) => match self.registry.get(id) {
                Ok(snapshot) if eligible(&snapshot) => Ok(vec![snapshot]),
                Ok(_) | Err(RegistryError::NotFound(_)) => {
                    Err(AggregateError::UnknownSource(id.clone()))
                }
                Err(e) => Err(AggregateError::UnknownSource(e.to_string())),
            },
            Scope::All => Ok(self
                .registry
                .list()
                .into_iter()
                .filter(|s| eligible(s))
                .collect()),
            Scope::Filter(expr) => Ok(self
                .registry
                .list()
                .into_iter()
                .filter(|s| eligible(s) && expr.evaluate(s))
                .collect()),
        }
    }

    /// Run a search over `scope`.
    pub async fn search(
        &self,
        scope: &str,
        request: &SearchRequest,
    ) -> Result<AggregateResult, AggregateError> {
        let started = Instant::now();
        debug!(scope, mode = %request.mode, phase = ?QueryPhase::Received, "Search received");

        let parsed = self.parse_scope(scope)?;
        let sources = self.resolve(&parsed, false).map_err(|e| {
            debug!(scope, phase = ?QueryPhase::Rejected, error = %e, "Search rejected");
            e
        })?;
        let aggregate = parsed.is_aggregate();
        debug!(scope, sources = sources.len(), phase = ?QueryPhase::ScopeResolved, "Scope resolved");

        debug!(scope, phase = ?QueryPhase::FanningOut, "Fanning out");
        let mut outcomes: Vec<UnitOutcome> = stream::iter(sources.into_iter().enumerate())
            .map(|(position, snapshot)| self.run_unit(position, snapshot, request, aggregate))
            .buffer_unordered(self.config.max_concurrent_sources.max(1))
            .collect()
            .await;
        outcomes.sort_by_key(|o| o.position);

        debug!(scope, phase = ?QueryPhase::Merging, "Merging");
        let mut releases = Vec::new();
        let mut reports = Vec::new();
        let mut errors = Vec::new();
        for outcome in outcomes {
            releases.extend(outcome.releases);
            reports.extend(outcome.report);
            errors.extend(outcome.failure);
        }

        releases.truncate(self.config.max_results);
        let total = releases.len();
        let releases: Vec<ReleaseInfo> = releases
            .into_iter()
            .skip(request.offset.unwrap_or(0))
            .take(request.limit.unwrap_or(usize::MAX))
            .collect();

        let duration_ms = started.elapsed().as_millis() as u64;
        AGGREGATE_RESULTS.observe(releases.len() as f64);
        debug!(
            scope,
            results = releases.len(),
            total,
            errors = errors.len(),
            duration_ms,
            phase = ?QueryPhase::Completed,
            "Search complete"
        );

        Ok(AggregateResult {
            releases,
            total,
            sources: reports,
            errors,
            duration_ms,
        })
    }

    async fn run_unit(
        &self,
        position: usize,
        snapshot: SourceSnapshot,
        request: &SearchRequest,
        aggregate: bool,
    ) -> UnitOutcome {
        let descriptor = &snapshot.descriptor;
        let mut outcome = UnitOutcome {
            position,
            releases: Vec::new(),
            report: None,
            failure: None,
        };

        if !descriptor.supports(request.mode) {
            if !aggregate {
                outcome.failure = Some(SourceFailure {
                    source_id: descriptor.id.clone(),
                    source_name: descriptor.name.clone(),
                    error: SourceError::UnsupportedMode(request.mode).to_string(),
                });
            }
            return outcome;
        }

        let source_request = self.source_request(&snapshot, request, aggregate);
        let signature = QuerySignature::of(&source_request);
        let started = Instant::now();

        let cached = if request.use_cache {
            self.cache.get(&descriptor.id, &signature)
        } else {
            None
        };

        let (releases, from_cache, error) = match cached {
            Some(entry) => (entry.results.as_ref().clone(), true, None),
            None => match self.query_live(&snapshot, &source_request).await {
                Ok(releases) => {
                    self.cache
                        .put(&descriptor.id, signature, releases.clone(), None);
                    (releases, false, None)
                }
                Err(e) => (Vec::new(), false, Some(e.to_string())),
            },
        };

        let releases: Vec<ReleaseInfo> = if aggregate {
            releases
                .iter()
                .map(ReleaseInfo::without_custom_categories)
                .collect()
        } else {
            releases
        };

        outcome.report = Some(SourceReport {
            id: descriptor.id.clone(),
            name: descriptor.name.clone(),
            results: releases.len(),
            from_cache,
            duration_ms: started.elapsed().as_millis() as u64,
            error: error.clone(),
        });
        outcome.failure = error.map(|error| SourceFailure {
            source_id: descriptor.id.clone(),
            source_name: descriptor.name.clone(),
            error,
        });
        outcome.releases = releases;
        outcome
    }

    /// Translate a client request into the source's own terms.
    fn source_request(
        &self,
        snapshot: &SourceSnapshot,
        request: &SearchRequest,
        aggregate: bool,
    ) -> SourceRequest {
        let map = &snapshot.descriptor.categories;
        let requested = if aggregate {
            strip_custom(&request.categories)
        } else {
            request.categories.clone()
        };

        let mut categories = Vec::new();
        for global in requested {
            let locals = map.to_local(&[global]);
            if locals.is_empty() {
                info!(
                    source = %snapshot.descriptor.id,
                    category = global,
                    "No local category for requested category, constraint dropped"
                );
            }
            for local in locals {
                if !categories.contains(&local) {
                    categories.push(local);
                }
            }
        }

        SourceRequest {
            mode: request.mode,
            terms: request.terms.clone(),
            categories,
        }
    }

    /// Query a source under its timeout, normalize, and record health.
    async fn query_live(
        &self,
        snapshot: &SourceSnapshot,
        request: &SourceRequest,
    ) -> Result<Vec<ReleaseInfo>, SourceError> {
        let id = snapshot.descriptor.id.as_str();
        let timeout = snapshot
            .adapter
            .timeout()
            .unwrap_or(Duration::from_secs(self.config.source_timeout_secs));

        let started = Instant::now();
        let result = tokio::time::timeout(timeout, snapshot.adapter.query(request))
            .await
            .unwrap_or(Err(SourceError::Timeout));
        SOURCE_QUERY_DURATION
            .with_label_values(&[id])
            .observe(started.elapsed().as_secs_f64());

        let recorded = match &result {
            Ok(items) => {
                SOURCE_QUERIES_TOTAL
                    .with_label_values(&[id, "success"])
                    .inc();
                debug!(source = id, results = items.len(), "Source answered");
                self.registry.record_outcome(id, Ok(()))
            }
            Err(e) => {
                let status = if matches!(e, SourceError::Timeout) {
                    "timeout"
                } else {
                    "error"
                };
                SOURCE_QUERIES_TOTAL.with_label_values(&[id, status]).inc();
                warn!(source = id, error = %e, "Source query failed");
                self.registry.record_outcome(id, Err(e.to_string()))
            }
        };
        if let Err(e) = recorded {
            // the source was removed by a reload while the query was in flight
            debug!(source = id, error = %e, "Outcome not recorded");
        }

        let items = result?;
        Ok(items
            .into_iter()
            .map(|item| ReleaseInfo::from_raw(item, &snapshot.descriptor))
            .collect())
    }

    /// Describe the sources a scope selects, without querying them.
    ///
    /// `all` and filter scopes include unconfigured sources; `configured`
    /// narrows the list further.
    pub fn capabilities(
        &self,
        scope: &str,
        configured: Option<bool>,
    ) -> Result<Vec<CapabilityEntry>, AggregateError> {
        let parsed = self.parse_scope(scope)?;
        Ok(self
            .resolve(&parsed, true)?
            .iter()
            .filter(|s| configured.map_or(true, |c| s.descriptor.configured == c))
            .map(CapabilityEntry::from)
            .collect())
    }

    /// Torznab caps for a search scope.
    pub fn caps(&self, scope: &str) -> Result<TorznabCaps, AggregateError> {
        let parsed = self.parse_scope(scope)?;
        let sources = self.resolve(&parsed, false)?;
        Ok(match (&parsed, sources.as_slice()) {
            (Scope::Source(_), [single]) => TorznabCaps::for_source(&single.descriptor),
            _ => TorznabCaps::merged(sources.iter().map(|s| s.descriptor.as_ref())),
        })
    }

    /// Swap the registered source set and drop cached results of sources
    /// that went away.
    pub fn reload_sources(
        &self,
        sources: Vec<(Arc<dyn Source>, bool)>,
    ) -> Result<Vec<String>, RegistryError> {
        let removed = self.registry.reload(sources)?;
        for id in &removed {
            let dropped = self.cache.invalidate_source(id);
            debug!(source = %id, dropped, "Cache shard of removed source invalidated");
        }
        info!(
            sources = self.registry.len(),
            removed = removed.len(),
            "Sources reloaded"
        );
        Ok(removed)
    }

    /// Probe a source with an unrestricted search, bypassing the cache.
    pub async fn test_source(&self, id: &str) -> Result<SourceTestOutcome, AggregateError> {
        let snapshot = self
            .registry
            .get(id)
            .map_err(|_| AggregateError::UnknownSource(id.to_string()))?;

        let started = Instant::now();
        let result = self.query_live(&snapshot, &SourceRequest::probe()).await;
        let passed = result.is_ok();
        if let Err(e) = self.registry.record_test(id, passed) {
            debug!(source = id, error = %e, "Test result not recorded");
        }
        info!(source = id, passed, "Source tested");

        Ok(SourceTestOutcome {
            id: id.to_string(),
            passed,
            results: result.as_ref().map_or(0, Vec::len),
            error: result.err().map(|e| e.to_string()),
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}
