//! Query parameters shared by the wire endpoints.
//!
//! Every field is kept as text so malformed values surface as a Torznab
//! "incorrect parameter" error instead of a generic extractor rejection.

use serde::Deserialize;
use thiserror::Error;
use trawl_core::{QueryTerms, SearchMode, SearchRequest};

/// What a wire request asks for (`t=`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFunction {
    Search(SearchMode),
    Indexers,
    Caps,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("Missing parameter ({0})")]
    Missing(&'static str),

    #[error("Incorrect parameter ({name}={value})")]
    Incorrect { name: &'static str, value: String },

    #[error("Function not available ({0})")]
    NoSuchFunction(String),
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct WireParams {
    pub t: Option<String>,
    #[serde(alias = "Query")]
    pub q: Option<String>,
    pub cat: Option<String>,
    pub imdbid: Option<String>,
    pub tvdbid: Option<String>,
    pub tmdbid: Option<String>,
    pub season: Option<String>,
    pub ep: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub cache: Option<String>,
    pub configured: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    /// Potato clients send their text query here.
    pub search: Option<String>,
}

impl WireParams {
    pub fn function(&self) -> Result<WireFunction, ParamError> {
        let t = self
            .t
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ParamError::Missing("t"))?;
        match t {
            "caps" => Ok(WireFunction::Caps),
            "indexers" => Ok(WireFunction::Indexers),
            other => SearchMode::from_torznab(other)
                .map(WireFunction::Search)
                .ok_or_else(|| ParamError::NoSuchFunction(other.to_string())),
        }
    }

    /// `configured=true|false` for `t=indexers`.
    pub fn configured(&self) -> Result<Option<bool>, ParamError> {
        parse_optional_bool("configured", self.configured.as_deref())
    }

    /// Build the aggregator request for a Torznab search.
    pub fn search_request(&self, mode: SearchMode) -> Result<SearchRequest, ParamError> {
        let terms = QueryTerms {
            text: self.q.clone(),
            imdb_id: self.imdb_id()?,
            tvdb_id: parse_optional("tvdbid", self.tvdbid.as_deref())?,
            tmdb_id: parse_optional("tmdbid", self.tmdbid.as_deref())?,
            season: self.season.clone(),
            episode: self.ep.clone(),
            artist: self.artist.clone(),
            album: self.album.clone(),
            author: self.author.clone(),
            title: self.title.clone(),
        };
        self.finish(SearchRequest::new(mode, terms))
    }

    /// Build the aggregator request for a potato (movie) search.
    pub fn potato_request(&self) -> Result<SearchRequest, ParamError> {
        let terms = QueryTerms {
            text: self.search.clone().or_else(|| self.q.clone()),
            imdb_id: self.imdb_id()?,
            ..Default::default()
        };
        let request = self.finish(SearchRequest::new(SearchMode::MovieSearch, terms))?;
        Ok(if request.categories.is_empty() {
            request.with_categories(vec![POTATO_CATEGORY])
        } else {
            request
        })
    }

    fn finish(&self, request: SearchRequest) -> Result<SearchRequest, ParamError> {
        let mut request = request
            .with_categories(self.categories()?)
            .with_paging(
                parse_optional("offset", self.offset.as_deref())?,
                parse_optional("limit", self.limit.as_deref())?,
            );
        if parse_optional_bool("cache", self.cache.as_deref())? == Some(false) {
            request = request.bypass_cache();
        }
        Ok(request)
    }

    fn categories(&self) -> Result<Vec<u32>, ParamError> {
        let Some(raw) = self.cat.as_deref() else {
            return Ok(Vec::new());
        };
        let mut categories = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let id = part.parse::<u32>().map_err(|_| ParamError::Incorrect {
                name: "cat",
                value: raw.to_string(),
            })?;
            if !categories.contains(&id) {
                categories.push(id);
            }
        }
        Ok(categories)
    }

    fn imdb_id(&self) -> Result<Option<String>, ParamError> {
        match self.imdbid.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            None => Ok(None),
            Some(raw) => trawl_core::source::normalize_imdb_id(raw)
                .map(Some)
                .ok_or_else(|| ParamError::Incorrect {
                    name: "imdbid",
                    value: raw.to_string(),
                }),
        }
    }
}

/// Movies, the only category potato clients search.
const POTATO_CATEGORY: u32 = 2000;

fn parse_optional<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<&str>,
) -> Result<Option<T>, ParamError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|_| ParamError::Incorrect {
            name,
            value: value.to_string(),
        }),
    }
}

fn parse_optional_bool(name: &'static str, raw: Option<&str>) -> Result<Option<bool>, ParamError> {
    match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") => Ok(None),
        Some("true") | Some("1") => Ok(Some(true)),
        Some("false") | Some("0") => Ok(Some(false)),
        Some(other) => Err(ParamError::Incorrect {
            name,
            value: other.to_string(),
        }),
    }
}
