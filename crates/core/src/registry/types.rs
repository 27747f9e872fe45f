//! Source descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::category::{CategoryError, CategoryMap};
use crate::source::{SearchMode, Source};

/// Access model of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    Public,
    SemiPrivate,
    Private,
}

impl SourceKind {
    /// Parse a `type:` filter value. `semi-private` is accepted as an alias.
    pub fn from_filter_value(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "public" => Some(Self::Public),
            "semiprivate" | "semi-private" => Some(Self::SemiPrivate),
            "private" => Some(Self::Private),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::SemiPrivate => "semi-private",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the registry knows about a source apart from its health.
///
/// Immutable once built; shared as `Arc<SourceDescriptor>`.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub kind: SourceKind,
    /// Declaration order, duplicates removed.
    pub tags: Vec<String>,
    pub language: String,
    pub modes: Vec<SearchMode>,
    pub categories: CategoryMap,
    pub configured: bool,
}

impl SourceDescriptor {
    /// Build a descriptor from what an adapter declares.
    pub fn from_source(source: &dyn Source, configured: bool) -> Result<Self, CategoryError> {
        let caps = source.capabilities();
        let categories = CategoryMap::new(caps.categories)?;

        let mut tags: Vec<String> = Vec::with_capacity(caps.tags.len());
        for tag in caps.tags {
            if !tags.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
                tags.push(tag);
            }
        }

        let mut modes: Vec<SearchMode> = Vec::with_capacity(caps.search_modes.len());
        for mode in caps.search_modes {
            if !modes.contains(&mode) {
                modes.push(mode);
            }
        }

        Ok(Self {
            id: source.id().to_string(),
            name: source.name().to_string(),
            description: caps.description,
            link: caps.link,
            kind: caps.kind,
            tags,
            language: caps.language,
            modes,
            categories,
            configured,
        })
    }

    pub fn supports(&self, mode: SearchMode) -> bool {
        self.modes.contains(&mode)
    }

    /// Case-insensitive tag membership.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}
