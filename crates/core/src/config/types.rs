use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::category::CategoryMapping;
use crate::registry::SourceKind;
use crate::source::{SearchMode, SourceCapabilities};

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    9117
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// API key (required when method = "api_key")
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    ApiKey,
}

/// Result cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// How long cached results stay fresh (default: 2100 = 35 minutes).
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
    /// Distinct cached queries kept per source (default: 1000).
    #[serde(default = "default_cache_max_entries")]
    pub max_entries_per_source: usize,
    /// How often expired entries are swept from memory (default: 300).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_cache_ttl() -> u64 {
    2100
}

fn default_cache_max_entries() -> usize {
    1000
}

fn default_sweep_interval() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
            max_entries_per_source: default_cache_max_entries(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Source health tracking configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthConfig {
    /// A source's last live outcome counts toward its status for this long
    /// (default: 86400 = 24 hours).
    #[serde(default = "default_health_window")]
    pub window_secs: u64,
}

fn default_health_window() -> u64 {
    86_400
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            window_secs: default_health_window(),
        }
    }
}

/// Fan-out configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AggregatorConfig {
    /// Sources queried at the same time per request (default: 16).
    #[serde(default = "default_max_concurrent_sources")]
    pub max_concurrent_sources: usize,
    /// Per-source timeout in seconds (default: 30).
    #[serde(default = "default_source_timeout")]
    pub source_timeout_secs: u64,
    /// Maximum merged results returned per request (default: 1000).
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_max_concurrent_sources() -> usize {
    16
}

fn default_source_timeout() -> u64 {
    30
}

fn default_max_results() -> usize {
    1000
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sources: default_max_concurrent_sources(),
            source_timeout_secs: default_source_timeout(),
            max_results: default_max_results(),
        }
    }
}

/// Available source adapters
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceBackend {
    /// An upstream Jackett-compatible results endpoint.
    Torznab,
}

/// One configured source
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    pub kind: SourceKind,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_modes")]
    pub modes: Vec<SearchMode>,
    /// Unconfigured sources are listed by capability queries but never searched.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Overrides `aggregator.source_timeout_secs` for this source.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub categories: Vec<CategoryMapping>,
    #[serde(default = "default_backend")]
    pub backend: SourceBackend,
    /// Torznab-specific configuration (required when backend = "torznab")
    #[serde(default)]
    pub torznab: Option<TorznabConfig>,
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_modes() -> Vec<SearchMode> {
    vec![SearchMode::Search]
}

fn default_enabled() -> bool {
    true
}

fn default_backend() -> SourceBackend {
    SourceBackend::Torznab
}

impl SourceConfig {
    /// Capabilities declared by this configuration block.
    pub fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities {
            kind: self.kind,
            tags: self.tags.clone(),
            language: self.language.clone(),
            search_modes: self.modes.clone(),
            categories: self.categories.clone(),
            description: self.description.clone(),
            link: self.link.clone(),
        }
    }
}

/// Upstream Torznab endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TorznabConfig {
    /// Upstream server URL (e.g., "http://localhost:9117")
    pub url: String,
    /// Upstream API key
    #[serde(default)]
    pub api_key: String,
    /// Upstream indexer id (defaults to the source id)
    #[serde(default)]
    pub indexer: Option<String>,
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub health: HealthConfig,
    pub aggregator: AggregatorConfig,
    pub sources: Vec<SanitizedSourceConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
    pub api_key_configured: bool,
}

/// Sanitized source config (upstream API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSourceConfig {
    pub id: String,
    pub name: String,
    pub kind: SourceKind,
    pub enabled: bool,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub api_key_configured: bool,
    pub categories: usize,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: match config.auth.method {
                    AuthMethod::None => "none".to_string(),
                    AuthMethod::ApiKey => "api_key".to_string(),
                },
                api_key_configured: config
                    .auth
                    .api_key
                    .as_ref()
                    .is_some_and(|k| !k.is_empty()),
            },
            server: config.server.clone(),
            cache: config.cache.clone(),
            health: config.health.clone(),
            aggregator: config.aggregator.clone(),
            sources: config
                .sources
                .iter()
                .map(|s| SanitizedSourceConfig {
                    id: s.id.clone(),
                    name: s.name.clone(),
                    kind: s.kind,
                    enabled: s.enabled,
                    backend: match s.backend {
                        SourceBackend::Torznab => "torznab".to_string(),
                    },
                    url: s.torznab.as_ref().map(|t| t.url.clone()),
                    api_key_configured: s
                        .torznab
                        .as_ref()
                        .is_some_and(|t| !t.api_key.is_empty()),
                    categories: s.categories.len(),
                })
                .collect(),
        }
    }
}
