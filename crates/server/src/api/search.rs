//! Wire query endpoints: Torznab XML, potato JSON and Jackett-style JSON.

use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};
use trawl_core::{
    AggregateResult, CategoryTaxonomy, ReleaseInfo, SearchMode, SourceFailure, SourceReport,
};

use super::error::{xml_response, ApiError, ErrorResponse};
use super::params::{ParamError, WireFunction, WireParams};
use super::torznab::{render_caps, render_indexers, render_results, ChannelInfo};
use crate::state::AppState;

const SERVER_TITLE: &str = "trawl";

// ============================================================================
// Torznab
// ============================================================================

/// GET /api/v2.0/indexers/{scope}/results/torznab[/api]
pub async fn torznab(
    State(state): State<Arc<AppState>>,
    Path(scope): Path<String>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<WireParams>,
) -> Response {
    match torznab_document(&state, &scope, &uri, &params).await {
        Ok(body) => xml_response(StatusCode::OK, body),
        Err(e) => {
            debug!(scope = %scope, error = %e, "Torznab request rejected");
            e.into_torznab()
        }
    }
}

async fn torznab_document(
    state: &AppState,
    scope: &str,
    uri: &Uri,
    params: &WireParams,
) -> Result<String, ApiError> {
    let aggregator = state.aggregator();
    match params.function()? {
        WireFunction::Caps => Ok(render_caps(&aggregator.caps(scope)?, SERVER_TITLE)?),
        WireFunction::Indexers => {
            let entries = aggregator.capabilities(scope, params.configured()?)?;
            Ok(render_indexers(&entries)?)
        }
        WireFunction::Search(mode) => {
            let request = params.search_request(mode)?;
            let result = aggregator.search(scope, &request).await?;
            log_source_errors(scope, &result);
            let channel = channel_for(state, scope, uri);
            Ok(render_results(&channel, &result.releases)?)
        }
    }
}

/// These formats have no slot for per-source errors, so they are only logged.
fn log_source_errors(scope: &str, result: &AggregateResult) {
    if result.errors.is_empty() {
        return;
    }
    let failed: Vec<&str> = result.errors.iter().map(|e| e.source_id.as_str()).collect();
    warn!(
        scope,
        failed = ?failed,
        returned = result.releases.len(),
        "Partial results, some sources failed"
    );
    for failure in &result.errors {
        debug!(source = %failure.source_id, error = %failure.error, "Source error omitted from response");
    }
}

fn channel_for(state: &AppState, scope: &str, uri: &Uri) -> ChannelInfo {
    let self_link = uri.path().to_string();
    match state.registry().get(scope) {
        Ok(snapshot) => {
            let d = &snapshot.descriptor;
            ChannelInfo {
                title: d.name.clone(),
                description: d.description.clone().unwrap_or_else(|| d.name.clone()),
                link: d.link.clone().unwrap_or_default(),
                language: d.language.clone(),
                self_link,
            }
        }
        Err(_) => ChannelInfo {
            title: SERVER_TITLE.to_string(),
            description: format!("Aggregated results for {}", scope),
            link: String::new(),
            language: "en-US".to_string(),
            self_link,
        },
    }
}

// ============================================================================
// Potato
// ============================================================================

#[derive(Debug, Serialize)]
pub struct PotatoResponse {
    pub results: Vec<PotatoRelease>,
    pub total_results: usize,
}

#[derive(Debug, Serialize)]
pub struct PotatoRelease {
    pub release_name: String,
    pub torrent_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    pub freeleech: bool,
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Megabytes.
    pub size: u64,
    pub leechers: u32,
    pub seeders: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<DateTime<Utc>>,
}

impl From<&ReleaseInfo> for PotatoRelease {
    fn from(release: &ReleaseInfo) -> Self {
        let seeders = release.seeders.unwrap_or(0);
        Self {
            release_name: release.title.clone(),
            torrent_id: guid(release),
            details_url: release.details_url.clone(),
            download_url: release.download_url().map(str::to_string),
            imdb_id: release.imdb_id.clone(),
            freeleech: false,
            kind: "movie",
            size: release.size_bytes.unwrap_or(0) / (1024 * 1024),
            leechers: release.peers.unwrap_or(0).saturating_sub(seeders),
            seeders,
            publish_date: release.publish_date,
        }
    }
}

/// GET /api/v2.0/indexers/{scope}/results/potato[/api]
pub async fn potato(
    State(state): State<Arc<AppState>>,
    Path(scope): Path<String>,
    Query(params): Query<WireParams>,
) -> Result<Json<PotatoResponse>, (StatusCode, Json<ErrorResponse>)> {
    let run = async {
        let request = params.potato_request()?;
        Ok::<_, ApiError>(state.aggregator().search(&scope, &request).await?)
    };

    match run.await {
        Ok(result) => {
            log_source_errors(&scope, &result);
            Ok(Json(PotatoResponse {
                results: result.releases.iter().map(PotatoRelease::from).collect(),
                total_results: result.total,
            }))
        }
        Err(e) => Err(e.into_json()),
    }
}

// ============================================================================
// Jackett-style JSON
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResultsResponse {
    pub results: Vec<JsonRelease>,
    pub indexers: Vec<JsonIndexer>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct JsonRelease {
    pub tracker: String,
    pub tracker_id: String,
    pub category_desc: Option<String>,
    pub title: String,
    pub guid: String,
    pub link: Option<String>,
    pub details: Option<String>,
    pub publish_date: Option<DateTime<Utc>>,
    pub category: Vec<u32>,
    pub size: Option<u64>,
    pub files: Option<u32>,
    pub grabs: Option<u32>,
    pub seeders: Option<u32>,
    pub peers: Option<u32>,
    pub info_hash: Option<String>,
    pub magnet_uri: Option<String>,
    pub imdb: Option<u64>,
}

impl From<&ReleaseInfo> for JsonRelease {
    fn from(release: &ReleaseInfo) -> Self {
        let taxonomy = CategoryTaxonomy::standard();
        Self {
            tracker: release.source_name.clone(),
            tracker_id: release.source_id.clone(),
            category_desc: release.categories.first().map(|id| taxonomy.name_of(*id)),
            title: release.title.clone(),
            guid: guid(release),
            link: release.link.clone(),
            details: release.details_url.clone(),
            publish_date: release.publish_date,
            category: release.categories.clone(),
            size: release.size_bytes,
            files: release.files,
            grabs: release.grabs,
            seeders: release.seeders,
            peers: release.peers,
            info_hash: release.info_hash.clone(),
            magnet_uri: release.magnet_uri.clone(),
            imdb: release
                .imdb_id
                .as_deref()
                .and_then(|id| id.trim_start_matches("tt").parse().ok()),
        }
    }
}

/// Per-source status, numbered the way Jackett clients expect.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct JsonIndexer {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    /// 1 = error, 2 = OK.
    pub status: u8,
    pub results: usize,
    pub error: Option<String>,
}

impl From<&SourceReport> for JsonIndexer {
    fn from(report: &SourceReport) -> Self {
        Self {
            id: report.id.clone(),
            name: report.name.clone(),
            status: if report.error.is_some() { 1 } else { 2 },
            results: report.results,
            error: report.error.clone(),
        }
    }
}

impl From<&SourceFailure> for JsonIndexer {
    fn from(failure: &SourceFailure) -> Self {
        Self {
            id: failure.source_id.clone(),
            name: failure.source_name.clone(),
            status: 1,
            results: 0,
            error: Some(failure.error.clone()),
        }
    }
}

fn indexers_of(result: &AggregateResult) -> Vec<JsonIndexer> {
    let mut indexers: Vec<JsonIndexer> = result.sources.iter().map(JsonIndexer::from).collect();
    // failures without a report (unsupported mode on a single source)
    for failure in &result.errors {
        if !result.sources.iter().any(|s| s.id == failure.source_id) {
            indexers.push(JsonIndexer::from(failure));
        }
    }
    indexers
}

/// GET /api/v2.0/indexers/{scope}/results
pub async fn results(
    State(state): State<Arc<AppState>>,
    Path(scope): Path<String>,
    Query(params): Query<WireParams>,
) -> Response {
    let run = async {
        let request = params.search_request(results_mode(&params)?)?;
        Ok::<_, ApiError>(state.aggregator().search(&scope, &request).await?)
    };

    match run.await {
        Ok(result) => Json(ResultsResponse {
            results: result.releases.iter().map(JsonRelease::from).collect(),
            indexers: indexers_of(&result),
        })
        .into_response(),
        Err(e) => e.into_json().into_response(),
    }
}

/// `t` is optional here and defaults to a basic search.
fn results_mode(params: &WireParams) -> Result<SearchMode, ParamError> {
    match params.function() {
        Ok(WireFunction::Search(mode)) => Ok(mode),
        Ok(_) => Err(ParamError::NoSuchFunction(
            params.t.clone().unwrap_or_default(),
        )),
        Err(ParamError::Missing(_)) => Ok(SearchMode::Search),
        Err(e) => Err(e),
    }
}

fn guid(release: &ReleaseInfo) -> String {
    release
        .details_url
        .as_deref()
        .or(release.download_url())
        .unwrap_or(&release.title)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use trawl_core::testing::fixtures;

    #[test]
    fn test_potato_release_conversion() {
        let mut release = fixtures::sample_release("one", "Movie 2024");
        release.size_bytes = Some(3 * 1024 * 1024);
        release.seeders = Some(4);
        release.peers = Some(10);

        let potato = PotatoRelease::from(&release);
        assert_eq!(potato.size, 3);
        assert_eq!(potato.seeders, 4);
        assert_eq!(potato.leechers, 6);
        assert_eq!(potato.torrent_id, "http://one.example/Movie 2024.torrent");

        let json = serde_json::to_value(&potato).unwrap();
        assert_eq!(json["type"], "movie");
    }

    #[test]
    fn test_json_release_uses_pascal_case() {
        let mut release = fixtures::sample_release("one", "Something");
        release.imdb_id = Some("tt0133093".to_string());
        let json = serde_json::to_value(JsonRelease::from(&release)).unwrap();
        assert_eq!(json["Tracker"], "one");
        assert_eq!(json["TrackerId"], "one");
        assert_eq!(json["Imdb"], 133093);
        assert_eq!(json["Category"][0], 8000);
    }

    #[test]
    fn test_indexers_include_failures_without_report() {
        let result = AggregateResult {
            releases: vec![],
            total: 0,
            sources: vec![],
            errors: vec![SourceFailure {
                source_id: "one".to_string(),
                source_name: "One".to_string(),
                error: "Search mode not supported: music".to_string(),
            }],
            duration_ms: 0,
        };
        let indexers = indexers_of(&result);
        assert_eq!(indexers.len(), 1);
        assert_eq!(indexers[0].status, 1);
    }
}
