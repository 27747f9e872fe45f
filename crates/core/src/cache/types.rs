use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

use crate::config::CacheConfig;
use crate::release::ReleaseInfo;
use crate::source::SourceRequest;

/// Order-independent fingerprint of a source request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuerySignature(String);

impl QuerySignature {
    pub fn of(request: &SourceRequest) -> Self {
        let digest = Sha256::digest(canonical_form(request).as_bytes());
        Self(digest.iter().map(|b| format!("{:02x}", b)).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuerySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0[..12.min(self.0.len())])
    }
}

/// One line per field in fixed order. Free text is lowercased with
/// whitespace collapsed; categories are sorted and de-duplicated.
fn canonical_form(request: &SourceRequest) -> String {
    fn text(value: &Option<String>) -> String {
        value
            .as_deref()
            .map(|v| {
                v.split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
                    .to_lowercase()
            })
            .unwrap_or_default()
    }
    fn number(value: Option<u32>) -> String {
        value.map(|v| v.to_string()).unwrap_or_default()
    }

    let terms = &request.terms;
    let mut categories = request.categories.clone();
    categories.sort_unstable();
    categories.dedup();
    let categories: Vec<String> = categories.iter().map(u32::to_string).collect();

    [
        format!("mode={}", request.mode.torznab_name()),
        format!("q={}", text(&terms.text)),
        format!("imdb={}", text(&terms.imdb_id)),
        format!("tvdb={}", number(terms.tvdb_id)),
        format!("tmdb={}", number(terms.tmdb_id)),
        format!("season={}", text(&terms.season)),
        format!("ep={}", text(&terms.episode)),
        format!("artist={}", text(&terms.artist)),
        format!("album={}", text(&terms.album)),
        format!("author={}", text(&terms.author)),
        format!("title={}", text(&terms.title)),
        format!("cat={}", categories.join(",")),
    ]
    .join("\n")
}

/// Cached results for one `(source, signature)`.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub results: Arc<Vec<ReleaseInfo>>,
    pub inserted_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CacheEntry {
    /// Expired strictly after `inserted_at + ttl`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.inserted_at > self.ttl
    }
}

/// Runtime cache knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub max_entries_per_source: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for CacheSettings {
    fn from(config: &CacheConfig) -> Self {
        Self {
            ttl: Duration::seconds(config.ttl_secs as i64),
            max_entries_per_source: config.max_entries_per_source,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceCacheStats {
    pub source: String,
    pub entries: usize,
    pub results: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub ttl_secs: i64,
    pub max_entries_per_source: usize,
    pub total_entries: usize,
    pub total_results: usize,
    pub sources: Vec<SourceCacheStats>,
}
