//! Types shared by every source adapter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::category::CategoryMapping;
use crate::registry::SourceKind;

/// Torznab search function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchMode {
    Search,
    TvSearch,
    MovieSearch,
    MusicSearch,
    BookSearch,
}

impl SearchMode {
    pub const ALL: [SearchMode; 5] = [
        SearchMode::Search,
        SearchMode::TvSearch,
        SearchMode::MovieSearch,
        SearchMode::MusicSearch,
        SearchMode::BookSearch,
    ];

    /// Parse the Torznab `t` parameter value.
    pub fn from_torznab(t: &str) -> Option<Self> {
        match t {
            "search" => Some(Self::Search),
            "tvsearch" => Some(Self::TvSearch),
            "movie" => Some(Self::MovieSearch),
            "music" => Some(Self::MusicSearch),
            "book" => Some(Self::BookSearch),
            _ => None,
        }
    }

    /// Value of the Torznab `t` parameter for this mode.
    pub fn torznab_name(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::TvSearch => "tvsearch",
            Self::MovieSearch => "movie",
            Self::MusicSearch => "music",
            Self::BookSearch => "book",
        }
    }

    /// Element name used in the Torznab caps `<searching>` block.
    pub fn caps_element(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::TvSearch => "tv-search",
            Self::MovieSearch => "movie-search",
            Self::MusicSearch => "music-search",
            Self::BookSearch => "book-search",
        }
    }

    /// Query parameters a source declaring this mode is expected to honor.
    pub fn supported_params(&self) -> &'static [&'static str] {
        match self {
            Self::Search => &["q"],
            Self::TvSearch => &["q", "season", "ep", "imdbid", "tvdbid", "tmdbid"],
            Self::MovieSearch => &["q", "imdbid", "tmdbid"],
            Self::MusicSearch => &["q", "artist", "album"],
            Self::BookSearch => &["q", "author", "title"],
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.torznab_name())
    }
}

/// What a source declares about itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceCapabilities {
    pub kind: SourceKind,
    #[serde(default)]
    pub tags: Vec<String>,
    pub language: String,
    pub search_modes: Vec<SearchMode>,
    #[serde(default)]
    pub categories: Vec<CategoryMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Search terms, independent of categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTerms {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvdb_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl QueryTerms {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Trim and collapse whitespace, drop empty fields, canonicalize the IMDB id.
    pub fn normalized(self) -> Self {
        Self {
            text: clean(self.text),
            imdb_id: self.imdb_id.as_deref().and_then(normalize_imdb_id),
            tvdb_id: self.tvdb_id,
            tmdb_id: self.tmdb_id,
            season: clean(self.season),
            episode: clean(self.episode),
            artist: clean(self.artist),
            album: clean(self.album),
            author: clean(self.author),
            title: clean(self.title),
        }
    }

    /// True when nothing constrains the search (an RSS-style "latest" query).
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|v| !v.is_empty())
}

/// Canonical `tt`-prefixed IMDB id, zero padded to at least seven digits.
pub fn normalize_imdb_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("tt")
        .or_else(|| trimmed.strip_prefix("TT"))
        .unwrap_or(trimmed);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let number: u64 = digits.parse().ok()?;
    Some(format!("tt{:07}", number))
}

/// Request handed to a single source, with categories already in its local
/// numbering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRequest {
    pub mode: SearchMode,
    #[serde(flatten)]
    pub terms: QueryTerms,
    #[serde(default)]
    pub categories: Vec<u32>,
}

impl SourceRequest {
    /// The request used to probe a source: an unrestricted basic search.
    pub fn probe() -> Self {
        Self {
            mode: SearchMode::Search,
            terms: QueryTerms::default(),
            categories: Vec::new(),
        }
    }
}

/// An item as a source reported it, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawItem {
    pub title: String,
    /// Source-local category ids.
    pub categories: Vec<u32>,
    pub publish_date: Option<DateTime<Utc>>,
    pub size_bytes: Option<u64>,
    pub seeders: Option<u32>,
    pub peers: Option<u32>,
    pub grabs: Option<u32>,
    pub files: Option<u32>,
    pub link: Option<String>,
    pub magnet_uri: Option<String>,
    pub info_hash: Option<String>,
    pub details_url: Option<String>,
    pub imdb_id: Option<String>,
}

/// Errors a source adapter can report.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("Source connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Source API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Search mode not supported: {0}")]
    UnsupportedMode(SearchMode),

    #[error("Internal error: {0}")]
    Internal(String),
}
