//! Mock source for testing.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::category::CategoryMapping;
use crate::registry::SourceKind;
use crate::source::{
    RawItem, SearchMode, Source, SourceCapabilities, SourceError, SourceRequest,
};

/// Mock implementation of the [`Source`] trait.
///
/// Provides controllable behavior for testing:
/// - Return configurable items
/// - Record every request for assertions
/// - Simulate failures and slow responses
///
/// Capabilities are fixed at construction through the `with_*` builders;
/// items, errors and delays can be changed at any time.
///
/// # Example
///
/// ```rust,ignore
/// use trawl_core::testing::{fixtures, MockSource};
///
/// let source = MockSource::new("alpha")
///     .with_tags(&["anime"])
///     .with_items(fixtures::raw_items("alpha", 3));
///
/// let items = source.query(&SourceRequest::probe()).await?;
/// assert_eq!(items.len(), 3);
/// assert_eq!(source.query_count(), 1);
/// ```
pub struct MockSource {
    id: String,
    name: String,
    capabilities: SourceCapabilities,
    timeout: Option<Duration>,
    items: Arc<Mutex<Vec<RawItem>>>,
    error: Arc<Mutex<Option<SourceError>>>,
    delay: Arc<Mutex<Option<Duration>>>,
    requests: Arc<Mutex<Vec<SourceRequest>>>,
}

impl std::fmt::Debug for MockSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSource")
            .field("id", &self.id)
            .field("capabilities", &self.capabilities)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl MockSource {
    /// A public, English source supporting every search mode, with no
    /// categories and no items.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            capabilities: SourceCapabilities {
                kind: SourceKind::Public,
                tags: Vec::new(),
                language: "en-US".to_string(),
                search_modes: SearchMode::ALL.to_vec(),
                categories: Vec::new(),
                description: None,
                link: None,
            },
            timeout: None,
            items: Arc::new(Mutex::new(Vec::new())),
            error: Arc::new(Mutex::new(None)),
            delay: Arc::new(Mutex::new(None)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_kind(mut self, kind: SourceKind) -> Self {
        self.capabilities.kind = kind;
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.capabilities.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.capabilities.language = language.to_string();
        self
    }

    pub fn with_modes(mut self, modes: &[SearchMode]) -> Self {
        self.capabilities.search_modes = modes.to_vec();
        self
    }

    pub fn with_categories(mut self, categories: Vec<CategoryMapping>) -> Self {
        self.capabilities.categories = categories;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_items(self, items: Vec<RawItem>) -> Self {
        self.set_items(items);
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        self.set_delay(Some(delay));
        self
    }

    pub fn with_error(self, error: SourceError) -> Self {
        self.set_error(Some(error));
        self
    }

    /// Set the items returned by subsequent queries.
    pub fn set_items(&self, items: Vec<RawItem>) {
        *lock(&self.items) = items;
    }

    /// Make every subsequent query fail with `error` (or succeed again with `None`).
    pub fn set_error(&self, error: Option<SourceError>) {
        *lock(&self.error) = error;
    }

    /// Delay every subsequent query.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *lock(&self.delay) = delay;
    }

    /// Requests received so far, in order.
    pub fn recorded_requests(&self) -> Vec<SourceRequest> {
        lock(&self.requests).clone()
    }

    pub fn query_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> SourceCapabilities {
        self.capabilities.clone()
    }

    async fn query(&self, request: &SourceRequest) -> Result<Vec<RawItem>, SourceError> {
        lock(&self.requests).push(request.clone());

        let delay = *lock(&self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let error = lock(&self.error).clone();
        match error {
            Some(error) => Err(error),
            None => Ok(lock(&self.items).clone()),
        }
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
