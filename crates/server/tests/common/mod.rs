//! Common test utilities for in-process API testing with mock sources.
//!
//! The fixture builds the real router around a registry of `MockSource`s
//! and a `ManualClock`, so handlers run end to end without any upstream.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use trawl_core::testing::{ManualClock, MockSource};
use trawl_core::{create_authenticator, load_config_from_str, Source};
use trawl_server::{create_router, AppState};

/// Re-export fixtures for test convenience
pub use trawl_core::testing::fixtures;

pub const API_KEY: &str = "test-api-key";

/// In-process server with controllable sources and time.
pub struct TestFixture {
    pub router: Router,
    pub state: Arc<AppState>,
    pub clock: Arc<ManualClock>,
    pub sources: Vec<Arc<MockSource>>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub text: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.text).unwrap_or(Value::Null)
    }
}

impl TestFixture {
    /// Every source configured, no authentication.
    pub fn new(sources: Vec<MockSource>) -> Self {
        Self::build(sources.into_iter().map(|s| (s, true)).collect(), false)
    }

    /// Sources paired with their configured flag.
    pub fn with_configured(sources: Vec<(MockSource, bool)>) -> Self {
        Self::build(sources, false)
    }

    /// Every source configured, API key authentication with [`API_KEY`].
    pub fn with_api_key(sources: Vec<MockSource>) -> Self {
        Self::build(sources.into_iter().map(|s| (s, true)).collect(), true)
    }

    fn build(sources: Vec<(MockSource, bool)>, api_key: bool) -> Self {
        let auth = if api_key {
            format!("[auth]\nmethod = \"api_key\"\napi_key = \"{}\"\n", API_KEY)
        } else {
            "[auth]\nmethod = \"none\"\n".to_string()
        };
        let config = load_config_from_str(&auth).unwrap();
        let authenticator = Arc::from(create_authenticator(&config.auth).unwrap());

        let clock = Arc::new(ManualClock::default());
        let mut handles = Vec::new();
        let mut adapters: Vec<(Arc<dyn Source>, bool)> = Vec::new();
        for (source, configured) in sources {
            let source = Arc::new(source);
            handles.push(source.clone());
            adapters.push((source as Arc<dyn Source>, configured));
        }

        let state = Arc::new(
            AppState::assemble(config, authenticator, adapters, clock.clone()).unwrap(),
        );
        Self {
            router: create_router(state.clone()),
            state,
            clock,
            sources: handles,
        }
    }

    pub fn source(&self, id: &str) -> &Arc<MockSource> {
        self.sources
            .iter()
            .find(|s| s.id() == id)
            .unwrap_or_else(|| panic!("no mock source '{}'", id))
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri).await
    }

    pub async fn post(&self, uri: &str) -> TestResponse {
        self.request(Method::POST, uri).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.request(Method::DELETE, uri).await
    }

    pub async fn request(&self, method: Method, uri: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let content_type = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.into_body().collect().await.unwrap().to_bytes();

        TestResponse {
            status,
            content_type,
            text: String::from_utf8_lossy(&body).to_string(),
        }
    }
}

/// Count `<item>` elements in a Torznab feed.
pub fn item_count(xml: &str) -> usize {
    xml.matches("<item>").count()
}
