pub mod aggregator;
pub mod auth;
pub mod cache;
pub mod category;
pub mod clock;
pub mod config;
pub mod filter;
pub mod metrics;
pub mod registry;
pub mod release;
pub mod source;
pub mod testing;

pub use aggregator::{
    AggregateError, AggregateResult, Aggregator, CapabilityEntry, QueryPhase, Scope,
    SearchRequest, SourceFailure, SourceReport, SourceTestOutcome,
};
pub use auth::{
    create_authenticator, ApiKeyAuthenticator, AuthError, AuthRequest, Authenticator, Identity,
    NoneAuthenticator,
};
pub use cache::{
    CacheEntry, CacheSettings, CacheStats, MemoryCache, QuerySignature, ResultCache,
    SourceCacheStats,
};
pub use category::{
    Category, CategoryError, CategoryMap, CategoryMapping, CategoryTaxonomy,
    CUSTOM_CATEGORY_OFFSET, FALLBACK_CATEGORY,
};
pub use clock::{Clock, SystemClock};
pub use config::{
    load_config, load_config_from_str, validate_config, AggregatorConfig, AuthConfig,
    AuthMethod, CacheConfig, Config, ConfigError, HealthConfig, SanitizedConfig, ServerConfig,
    SourceBackend, SourceConfig, TorznabConfig,
};
pub use filter::{parse_filter, FilterError, FilterExpr, FilterField, FilterSubject};
pub use registry::{
    derive_status, CapsCategory, HealthState, ModeCaps, RegistryError, SourceDescriptor,
    SourceKind, SourceRegistry, SourceSnapshot, SourceStatus, TestResult, TorznabCaps,
};
pub use release::ReleaseInfo;
pub use source::{
    build_sources, QueryTerms, RawItem, SearchMode, Source, SourceCapabilities, SourceError,
    SourceRequest, TorznabSource,
};
