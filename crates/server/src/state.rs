use std::sync::Arc;

use trawl_core::{
    Aggregator, Authenticator, Clock, Config, MemoryCache, ResultCache, SanitizedConfig, Source,
    SourceRegistry,
};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    aggregator: Arc<Aggregator>,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        aggregator: Arc<Aggregator>,
    ) -> Self {
        Self {
            config,
            authenticator,
            aggregator,
        }
    }

    /// Wire a registry, cache and aggregator around already-built adapters.
    pub fn assemble(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        sources: Vec<(Arc<dyn Source>, bool)>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let window = chrono::Duration::seconds(config.health.window_secs as i64);
        let registry = Arc::new(SourceRegistry::with_sources(sources, clock.clone(), window)?);
        let cache: Arc<dyn ResultCache> =
            Arc::new(MemoryCache::with_clock((&config.cache).into(), clock));
        let aggregator = Arc::new(Aggregator::new(
            registry,
            cache,
            config.aggregator.clone(),
        ));
        Ok(Self::new(config, authenticator, aggregator))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn aggregator(&self) -> &Aggregator {
        self.aggregator.as_ref()
    }

    pub fn registry(&self) -> &SourceRegistry {
        self.aggregator.registry()
    }

    pub fn cache(&self) -> &dyn ResultCache {
        self.aggregator.cache().as_ref()
    }
}
