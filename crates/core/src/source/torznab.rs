//! Upstream Torznab (Jackett-compatible) source adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::{SourceConfig, TorznabConfig};

use super::{QueryTerms, RawItem, SearchMode, Source, SourceCapabilities, SourceError, SourceRequest};

/// A source backed by one indexer of an upstream Jackett-compatible server.
pub struct TorznabSource {
    client: Client,
    config: SourceConfig,
    upstream: TorznabConfig,
    capabilities: SourceCapabilities,
}

impl TorznabSource {
    /// Create a new TorznabSource for the given source block.
    pub fn new(config: SourceConfig) -> Result<Self, SourceError> {
        let upstream = config.torznab.clone().ok_or_else(|| {
            SourceError::Internal(format!("source '{}' has no [torznab] section", config.id))
        })?;

        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| SourceError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let capabilities = config.capabilities();

        Ok(Self {
            client,
            config,
            upstream,
            capabilities,
        })
    }

    fn indexer(&self) -> &str {
        self.upstream.indexer.as_deref().unwrap_or(&self.config.id)
    }

    /// Build the upstream results URL for a search.
    fn build_search_url(&self, request: &SourceRequest) -> String {
        let mut url = format!(
            "{}/api/v2.0/indexers/{}/results?apikey={}&Query={}",
            self.upstream.url.trim_end_matches('/'),
            urlencoding::encode(self.indexer()),
            urlencoding::encode(&self.upstream.api_key),
            urlencoding::encode(&query_text(request.mode, &request.terms))
        );

        for cat_id in &request.categories {
            url.push_str(&format!("&Category[]={}", cat_id));
        }

        url
    }
}

#[async_trait]
impl Source for TorznabSource {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn capabilities(&self) -> SourceCapabilities {
        self.capabilities.clone()
    }

    async fn query(&self, request: &SourceRequest) -> Result<Vec<RawItem>, SourceError> {
        let url = self.build_search_url(request);
        debug!(source = %self.config.id, indexer = self.indexer(), mode = %request.mode, "Querying upstream");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout
            } else if e.is_connect() {
                SourceError::ConnectionFailed(e.to_string())
            } else {
                SourceError::ApiError(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::ApiError(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let upstream: UpstreamResponse = response
            .json()
            .await
            .map_err(|e| SourceError::ApiError(format!("Failed to parse response: {}", e)))?;

        debug!(
            source = %self.config.id,
            results = upstream.Results.len(),
            "Upstream query complete"
        );

        Ok(upstream.Results.into_iter().map(RawItem::from).collect())
    }

    fn timeout(&self) -> Option<Duration> {
        self.config.timeout_secs.map(Duration::from_secs)
    }
}

/// Collapse structured terms into the single free-text query upstream accepts.
fn query_text(mode: SearchMode, terms: &QueryTerms) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(text) = &terms.text {
        parts.push(text.clone());
    }

    match mode {
        SearchMode::TvSearch => match (&terms.season, &terms.episode) {
            (Some(season), Some(ep)) => parts.push(format!("S{:0>2}E{:0>2}", season, ep)),
            (Some(season), None) => parts.push(format!("S{:0>2}", season)),
            _ => {}
        },
        SearchMode::MusicSearch if terms.text.is_none() => {
            parts.extend(terms.artist.iter().chain(terms.album.iter()).cloned());
        }
        SearchMode::BookSearch if terms.text.is_none() => {
            parts.extend(terms.author.iter().chain(terms.title.iter()).cloned());
        }
        _ => {}
    }

    if parts.is_empty() {
        if let Some(imdb) = &terms.imdb_id {
            parts.push(imdb.clone());
        }
    }

    parts.join(" ")
}

/// Parse the upstream date format.
fn parse_upstream_date(date_str: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(date_str, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}

// Upstream API response types
#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct UpstreamResponse {
    Results: Vec<UpstreamResult>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct UpstreamResult {
    Title: String,
    MagnetUri: Option<String>,
    Link: Option<String>,
    InfoHash: Option<String>,
    Size: Option<i64>,
    Seeders: Option<i32>,
    Peers: Option<i32>,
    Grabs: Option<i32>,
    Files: Option<i32>,
    #[serde(default)]
    Category: Vec<u32>,
    PublishDate: Option<String>,
    Details: Option<String>,
    Imdb: Option<i64>,
}

impl From<UpstreamResult> for RawItem {
    fn from(r: UpstreamResult) -> Self {
        let non_negative = |v: Option<i32>| v.filter(|n| *n >= 0).map(|n| n as u32);
        RawItem {
            title: r.Title,
            categories: r.Category,
            publish_date: r.PublishDate.and_then(|d| parse_upstream_date(&d)),
            size_bytes: r.Size.filter(|s| *s >= 0).map(|s| s as u64),
            seeders: non_negative(r.Seeders),
            peers: non_negative(r.Peers),
            grabs: non_negative(r.Grabs),
            files: non_negative(r.Files),
            link: r.Link,
            magnet_uri: r.MagnetUri,
            info_hash: r.InfoHash.map(|h| h.to_lowercase()),
            details_url: r.Details,
            imdb_id: r.Imdb.filter(|id| *id > 0).map(|id| format!("tt{:07}", id)),
        }
    }
}
