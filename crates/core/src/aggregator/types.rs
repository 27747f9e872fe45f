use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::category::CategoryMapping;
use crate::filter::{parse_filter, FilterError, FilterExpr};
use crate::registry::{SourceKind, SourceSnapshot, SourceStatus, TestResult, TorznabCaps};
use crate::release::ReleaseInfo;
use crate::source::{QueryTerms, SearchMode};

/// Which sources a request addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Every configured source.
    All,
    /// One source by id.
    Source(String),
    /// Configured sources matching the expression.
    Filter(FilterExpr),
}

impl Scope {
    /// `all`, a filter expression (anything containing `:`), or a source id.
    pub fn parse(raw: &str) -> Result<Self, FilterError> {
        let raw = raw.trim();
        if raw == "all" {
            Ok(Self::All)
        } else if raw.contains(':') {
            Ok(Self::Filter(parse_filter(raw)?))
        } else {
            Ok(Self::Source(raw.to_string()))
        }
    }

    /// True for scopes that may cover more than one source.
    pub fn is_aggregate(&self) -> bool {
        !matches!(self, Self::Source(_))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Source(id) => f.write_str(id),
            Self::Filter(expr) => write!(f, "{}", expr),
        }
    }
}

/// Lifecycle of one aggregate query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPhase {
    Received,
    ScopeResolved,
    FanningOut,
    Merging,
    Completed,
    Rejected,
}

/// A client search, categories in the global taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub mode: SearchMode,
    pub terms: QueryTerms,
    pub categories: Vec<u32>,
    /// When false the cache is not read, but fresh results are still stored.
    pub use_cache: bool,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl SearchRequest {
    pub fn new(mode: SearchMode, terms: QueryTerms) -> Self {
        Self {
            mode,
            terms: terms.normalized(),
            categories: Vec::new(),
            use_cache: true,
            limit: None,
            offset: None,
        }
    }

    pub fn with_categories(mut self, categories: Vec<u32>) -> Self {
        self.categories = categories;
        self
    }

    pub fn bypass_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    pub fn with_paging(mut self, offset: Option<usize>, limit: Option<usize>) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }
}

/// What happened at one source during a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub id: String,
    pub name: String,
    pub results: usize,
    pub from_cache: bool,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Error record for a source that could not answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub source_id: String,
    pub source_name: String,
    pub error: String,
}

/// Merged outcome of a search.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateResult {
    pub releases: Vec<ReleaseInfo>,
    /// Results available after the cap, before paging.
    pub total: usize,
    /// One report per source that was queried or answered from cache.
    pub sources: Vec<SourceReport>,
    pub errors: Vec<SourceFailure>,
    pub duration_ms: u64,
}

/// Describes a source without querying it.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityEntry {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub kind: SourceKind,
    pub language: String,
    pub tags: Vec<String>,
    pub configured: bool,
    pub modes: Vec<SearchMode>,
    pub categories: Vec<CategoryMapping>,
    pub caps: TorznabCaps,
    pub status: SourceStatus,
    pub last_test_result: TestResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl From<&SourceSnapshot> for CapabilityEntry {
    fn from(snapshot: &SourceSnapshot) -> Self {
        let d = &snapshot.descriptor;
        Self {
            id: d.id.clone(),
            name: d.name.clone(),
            description: d.description.clone(),
            link: d.link.clone(),
            kind: d.kind,
            language: d.language.clone(),
            tags: d.tags.clone(),
            configured: d.configured,
            modes: d.modes.clone(),
            categories: d.categories.mappings().to_vec(),
            caps: TorznabCaps::for_source(d),
            status: snapshot.status,
            last_test_result: snapshot.health.last_test_result,
            last_error: snapshot.health.last_error.clone(),
        }
    }
}

/// Result of an explicit source test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceTestOutcome {
    pub id: String,
    pub passed: bool,
    pub results: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Reasons a whole request is rejected.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("Invalid filter expression: {0}")]
    Filter(#[from] FilterError),

    #[error("Unknown source: {0}")]
    UnknownSource(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterField;

    #[test]
    fn test_scope_parse() {
        assert_eq!(Scope::parse("all").unwrap(), Scope::All);
        assert_eq!(Scope::parse("nyaa").unwrap(), Scope::Source("nyaa".to_string()));
        assert!(matches!(Scope::parse("tag:anime").unwrap(), Scope::Filter(_)));
        assert_eq!(
            Scope::parse("foo:bar").unwrap_err(),
            FilterError::UnknownField("foo".to_string())
        );
    }

    #[test]
    fn test_scope_is_aggregate() {
        assert!(Scope::All.is_aggregate());
        assert!(!Scope::Source("x".to_string()).is_aggregate());
        let filter = Scope::Filter(FilterExpr::Atom(crate::filter::Atom::new(
            FilterField::Tag,
            "x",
        )));
        assert!(filter.is_aggregate());
        assert_eq!(filter.to_string(), "tag:x");
    }

    #[test]
    fn test_search_request_normalizes_terms() {
        let request = SearchRequest::new(SearchMode::Search, QueryTerms::text("  a   b "));
        assert_eq!(request.terms.text.as_deref(), Some("a b"));
        assert!(request.use_cache);
        assert!(!request.bypass_cache().use_cache);
    }
}
