//! Source adapter contract.
//!
//! A `Source` is one external catalog. Adapters turn a [`SourceRequest`]
//! (categories already in the source's local numbering) into [`RawItem`]s;
//! everything after that (category normalization, caching, merging) happens
//! in the aggregator.

mod torznab;
mod types;

pub use torznab::TorznabSource;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{SourceBackend, SourceConfig};

/// Trait implemented by every source adapter.
#[async_trait]
pub trait Source: Send + Sync {
    /// Stable identifier, used in scopes and cache keys.
    fn id(&self) -> &str;

    /// Display name.
    fn name(&self) -> &str;

    /// Declared capabilities. Must not perform I/O.
    fn capabilities(&self) -> SourceCapabilities;

    /// Run one search against the source.
    async fn query(&self, request: &SourceRequest) -> Result<Vec<RawItem>, SourceError>;

    /// Per-source timeout overriding the aggregator default.
    fn timeout(&self) -> Option<Duration> {
        None
    }
}

/// Build adapters for every configured source.
///
/// Returns `(adapter, configured)` pairs ready for the registry.
pub fn build_sources(
    configs: &[SourceConfig],
) -> Result<Vec<(Arc<dyn Source>, bool)>, SourceError> {
    configs
        .iter()
        .map(|config| {
            let adapter: Arc<dyn Source> = match config.backend {
                SourceBackend::Torznab => Arc::new(TorznabSource::new(config.clone())?),
            };
            Ok((adapter, config.enabled))
        })
        .collect()
}
