//! In-process tests for the wire surface over mock sources.

mod common;

use axum::http::StatusCode;
use common::{fixtures, item_count, TestFixture, API_KEY};
use trawl_core::testing::MockSource;
use trawl_core::{CategoryMapping, SearchMode, SourceError, SourceKind};

const TORZNAB_ALL: &str = "/api/v2.0/indexers/all/results/torznab";

fn two_sources() -> TestFixture {
    TestFixture::new(vec![
        MockSource::new("alpha").with_items(fixtures::raw_items("alpha", 3)),
        MockSource::new("beta").with_items(fixtures::raw_items("beta", 2)),
    ])
}

// =============================================================================
// Torznab search
// =============================================================================

#[tokio::test]
async fn test_torznab_search_merges_all_sources() {
    let fixture = two_sources();

    let response = fixture.get(&format!("{}?t=search&q=item", TORZNAB_ALL)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response
        .content_type
        .as_deref()
        .unwrap_or_default()
        .starts_with("application/xml"));
    assert!(response.text.contains("<rss"));
    assert_eq!(item_count(&response.text), 5);
    assert!(response.text.contains("jackettindexer id=\"alpha\""));
    assert!(response.text.contains("jackettindexer id=\"beta\""));

    assert_eq!(fixture.source("alpha").query_count(), 1);
    assert_eq!(fixture.source("beta").query_count(), 1);
}

#[tokio::test]
async fn test_torznab_api_suffix_and_single_source() {
    let fixture = two_sources();

    let response = fixture
        .get("/api/v2.0/indexers/beta/results/torznab/api?t=search&q=item")
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(item_count(&response.text), 2);
    assert_eq!(fixture.source("alpha").query_count(), 0);
}

#[tokio::test]
async fn test_repeated_search_is_served_from_cache() {
    let fixture = two_sources();
    let uri = format!("{}?t=search&q=item", TORZNAB_ALL);

    let first = fixture.get(&uri).await;
    let second = fixture.get(&uri).await;
    assert_eq!(item_count(&first.text), item_count(&second.text));
    assert_eq!(fixture.source("alpha").query_count(), 1);

    let bypass = fixture.get(&format!("{}&cache=false", uri)).await;
    assert_eq!(bypass.status, StatusCode::OK);
    assert_eq!(fixture.source("alpha").query_count(), 2);
}

#[tokio::test]
async fn test_limit_and_offset_page_the_feed() {
    let fixture = two_sources();

    let response = fixture
        .get(&format!("{}?t=search&q=item&limit=2&offset=1", TORZNAB_ALL))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(item_count(&response.text), 2);
}

#[tokio::test]
async fn test_failing_source_does_not_fail_the_feed() {
    let fixture = TestFixture::new(vec![
        MockSource::new("good").with_items(fixtures::raw_items("good", 2)),
        MockSource::new("bad").with_error(SourceError::ConnectionFailed("refused".to_string())),
    ]);

    let response = fixture.get(&format!("{}?t=search&q=x", TORZNAB_ALL)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(item_count(&response.text), 2);
}

// =============================================================================
// Torznab functions and errors
// =============================================================================

#[tokio::test]
async fn test_caps_lists_mapped_categories() {
    let fixture = TestFixture::new(vec![MockSource::new("movies")
        .with_categories(vec![CategoryMapping::new(1, vec![2000])])]);

    let response = fixture
        .get("/api/v2.0/indexers/movies/results/torznab?t=caps")
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text.contains("<caps>"));
    assert!(response.text.contains("<searching>"));
    assert!(response.text.contains("id=\"2000\""));
    assert_eq!(fixture.source("movies").query_count(), 0);
}

#[tokio::test]
async fn test_indexers_function_honours_configured_filter() {
    let fixture = TestFixture::with_configured(vec![
        (MockSource::new("on"), true),
        (MockSource::new("off"), false),
    ]);

    let everything = fixture
        .get(&format!("{}?t=indexers", TORZNAB_ALL))
        .await;
    assert_eq!(everything.status, StatusCode::OK);
    assert!(everything.text.contains("id=\"on\""));
    assert!(everything.text.contains("id=\"off\""));

    let configured = fixture
        .get(&format!("{}?t=indexers&configured=true", TORZNAB_ALL))
        .await;
    assert!(configured.text.contains("id=\"on\""));
    assert!(!configured.text.contains("id=\"off\""));
}

#[tokio::test]
async fn test_missing_function_is_error_200() {
    let fixture = two_sources();

    let response = fixture.get(TORZNAB_ALL).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.text.contains("<error code=\"200\""));
}

#[tokio::test]
async fn test_unknown_function_is_error_203() {
    let fixture = two_sources();

    let response = fixture.get(&format!("{}?t=browse", TORZNAB_ALL)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.text.contains("<error code=\"203\""));
}

#[tokio::test]
async fn test_bad_filter_is_error_201_without_querying() {
    let fixture = two_sources();

    let response = fixture
        .get("/api/v2.0/indexers/foo:bar/results/torznab?t=search&q=x")
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.text.contains("<error code=\"201\""));
    assert_eq!(fixture.source("alpha").query_count(), 0);
    assert_eq!(fixture.source("beta").query_count(), 0);
}

#[tokio::test]
async fn test_unknown_source_is_error_201() {
    let fixture = two_sources();

    let response = fixture
        .get("/api/v2.0/indexers/nowhere/results/torznab?t=search&q=x")
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.text.contains("<error code=\"201\""));
}

#[tokio::test]
async fn test_filter_scope_selects_sources() {
    let fixture = TestFixture::new(vec![
        MockSource::new("open")
            .with_kind(SourceKind::Public)
            .with_items(fixtures::raw_items("open", 1)),
        MockSource::new("closed")
            .with_kind(SourceKind::Private)
            .with_items(fixtures::raw_items("closed", 1)),
    ]);

    let response = fixture
        .get("/api/v2.0/indexers/type:private/results/torznab?t=search&q=x")
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(item_count(&response.text), 1);
    assert_eq!(fixture.source("open").query_count(), 0);
    assert_eq!(fixture.source("closed").query_count(), 1);
}

#[tokio::test]
async fn test_unsupported_mode_on_single_source_yields_empty_feed() {
    let fixture = TestFixture::new(vec![MockSource::new("general")
        .with_modes(&[SearchMode::Search])
        .with_items(fixtures::raw_items("general", 2))]);

    let response = fixture
        .get("/api/v2.0/indexers/general/results/torznab?t=music&artist=someone")
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(item_count(&response.text), 0);
    assert_eq!(fixture.source("general").query_count(), 0);
}

// =============================================================================
// JSON surfaces
// =============================================================================

#[tokio::test]
async fn test_potato_returns_movie_json() {
    let fixture = TestFixture::new(vec![
        MockSource::new("films").with_items(fixtures::raw_items("films", 2))
    ]);

    let response = fixture
        .get("/api/v2.0/indexers/all/results/potato?imdbid=tt0133093")
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let json = response.json();
    assert_eq!(json["total_results"], 2);
    assert_eq!(json["results"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["results"][0]["type"], "movie");
    assert_eq!(json["results"][0]["size"], 700);
    assert_eq!(json["results"][0]["leechers"], 5);

    let requests = fixture.source("films").recorded_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].mode, SearchMode::MovieSearch);
}

#[tokio::test]
async fn test_results_json_reports_indexer_errors() {
    let fixture = TestFixture::new(vec![
        MockSource::new("good").with_items(fixtures::raw_items("good", 2)),
        MockSource::new("bad").with_error(SourceError::Timeout),
    ]);

    let response = fixture
        .get("/api/v2.0/indexers/all/results?Query=item")
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let json = response.json();
    assert_eq!(json["Results"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["Results"][0]["TrackerId"], "good");

    let indexers = json["Indexers"].as_array().cloned().unwrap_or_default();
    assert_eq!(indexers.len(), 2);
    let bad = indexers.iter().find(|i| i["ID"] == "bad").unwrap();
    assert_eq!(bad["Status"], 1);
    assert!(bad["Error"].is_string());
    let good = indexers.iter().find(|i| i["ID"] == "good").unwrap();
    assert_eq!(good["Status"], 2);
    assert_eq!(good["Results"], 2);
}

#[tokio::test]
async fn test_results_json_rejects_bad_filter() {
    let fixture = two_sources();

    let response = fixture
        .get("/api/v2.0/indexers/foo:bar/results?Query=x")
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["error"].is_string());
}

// =============================================================================
// Indexer management and cache
// =============================================================================

#[tokio::test]
async fn test_indexer_listing_and_test() {
    let fixture = TestFixture::new(vec![
        MockSource::new("good").with_items(fixtures::raw_items("good", 1)),
        MockSource::new("bad").with_error(SourceError::ApiError("denied".to_string())),
    ]);

    let listing = fixture.get("/api/v2.0/indexers").await.json();
    let indexers = listing["indexers"].as_array().cloned().unwrap_or_default();
    assert_eq!(indexers.len(), 2);

    let passed = fixture.post("/api/v2.0/indexers/good/test").await;
    assert_eq!(passed.status, StatusCode::OK);
    assert_eq!(passed.json()["passed"], true);

    let failed = fixture.post("/api/v2.0/indexers/bad/test").await;
    assert_eq!(failed.status, StatusCode::OK);
    assert_eq!(failed.json()["passed"], false);
    assert!(failed.json()["error"].is_string());

    let missing = fixture.post("/api/v2.0/indexers/nowhere/test").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cache_stats_and_clear() {
    let fixture = two_sources();
    fixture
        .get(&format!("{}?t=search&q=item", TORZNAB_ALL))
        .await;

    let stats = fixture.get("/api/v2.0/server/cache").await.json();
    assert_eq!(stats["total_entries"], 2);
    assert_eq!(stats["total_results"], 5);

    let cleared = fixture.delete("/api/v2.0/server/cache").await;
    assert_eq!(cleared.status, StatusCode::OK);
    assert_eq!(cleared.json()["message"], "Cleared 2 cached queries");

    let stats = fixture.get("/api/v2.0/server/cache").await.json();
    assert_eq!(stats["total_entries"], 0);
}

// =============================================================================
// Admin endpoints and auth
// =============================================================================

#[tokio::test]
async fn test_health_and_metrics() {
    let fixture = two_sources();

    let health = fixture.get("/api/v1/health").await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.json()["status"], "ok");
    assert_eq!(health.json()["sources"], 2);

    fixture
        .get(&format!("{}?t=search&q=item", TORZNAB_ALL))
        .await;
    let metrics = fixture.get("/metrics").await;
    assert_eq!(metrics.status, StatusCode::OK);
    assert!(metrics.text.contains("trawl_http_requests_total"));
}

#[tokio::test]
async fn test_api_key_required_on_wire_routes() {
    let fixture = TestFixture::with_api_key(vec![
        MockSource::new("alpha").with_items(fixtures::raw_items("alpha", 1))
    ]);

    let denied = fixture.get(&format!("{}?t=search&q=x", TORZNAB_ALL)).await;
    assert_eq!(denied.status, StatusCode::UNAUTHORIZED);
    assert!(denied.text.contains("<error code=\"100\""));
    assert_eq!(fixture.source("alpha").query_count(), 0);

    let allowed = fixture
        .get(&format!("{}?t=search&q=x&apikey={}", TORZNAB_ALL, API_KEY))
        .await;
    assert_eq!(allowed.status, StatusCode::OK);
    assert_eq!(item_count(&allowed.text), 1);

    let listing = fixture.get("/api/v2.0/indexers").await;
    assert_eq!(listing.status, StatusCode::UNAUTHORIZED);

    let health = fixture.get("/api/v1/health").await;
    assert_eq!(health.status, StatusCode::OK);
}

#[tokio::test]
async fn test_potato_with_failing_source_returns_partial_results() {
    let fixture = TestFixture::new(vec![
        MockSource::new("films").with_items(fixtures::raw_items("films", 2)),
        MockSource::new("down").with_error(SourceError::Timeout),
    ]);

    let response = fixture
        .get("/api/v2.0/indexers/all/results/potato?search=films")
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["total_results"], 2);
    assert_eq!(fixture.source("down").query_count(), 1);
}

#[tokio::test]
async fn test_admin_actions_with_api_key() {
    let fixture = TestFixture::with_api_key(vec![
        MockSource::new("alpha").with_items(fixtures::raw_items("alpha", 1))
    ]);
    fixture
        .get(&format!("{}?t=search&q=x&apikey={}", TORZNAB_ALL, API_KEY))
        .await;

    let denied = fixture.post("/api/v2.0/indexers/alpha/test").await;
    assert_eq!(denied.status, StatusCode::UNAUTHORIZED);

    let tested = fixture
        .post(&format!("/api/v2.0/indexers/alpha/test?apikey={}", API_KEY))
        .await;
    assert_eq!(tested.status, StatusCode::OK);
    assert_eq!(tested.json()["passed"], true);

    let cleared = fixture
        .delete(&format!("/api/v2.0/server/cache?apikey={}", API_KEY))
        .await;
    assert_eq!(cleared.status, StatusCode::OK);
    assert_eq!(cleared.json()["message"], "Cleared 1 cached queries");
}
