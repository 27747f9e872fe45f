//! Normalized search results.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::category::{strip_custom, MappingOrigin, FALLBACK_CATEGORY};
use crate::registry::SourceDescriptor;
use crate::source::RawItem;

/// One result in the common schema. Category ids are global.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReleaseInfo {
    pub title: String,
    pub categories: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seeders: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peers: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grabs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magnet_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    pub source_id: String,
    pub source_name: String,
}

impl ReleaseInfo {
    /// Normalize an item reported by `source`.
    ///
    /// Each local category is translated to global ids; items without any
    /// category are filed under the fallback.
    pub fn from_raw(item: RawItem, source: &SourceDescriptor) -> Self {
        let mut categories: Vec<u32> = Vec::new();
        let locals = if item.categories.is_empty() {
            vec![None]
        } else {
            item.categories.iter().copied().map(Some).collect()
        };

        for local in locals {
            let (ids, origin) = match local {
                Some(local) => source.categories.resolve(local),
                None => (
                    vec![FALLBACK_CATEGORY],
                    MappingOrigin::Fallback,
                ),
            };
            if origin == MappingOrigin::Fallback {
                debug!(source = %source.id, local = ?local, title = %item.title, "Unmapped category, filed under fallback");
            }
            for id in ids {
                if !categories.contains(&id) {
                    categories.push(id);
                }
            }
        }

        Self {
            title: item.title,
            categories,
            publish_date: item.publish_date,
            size_bytes: item.size_bytes,
            seeders: item.seeders,
            peers: item.peers,
            grabs: item.grabs,
            files: item.files,
            link: item.link,
            magnet_uri: item.magnet_uri,
            info_hash: item.info_hash,
            details_url: item.details_url,
            imdb_id: item.imdb_id,
            source_id: source.id.clone(),
            source_name: source.name.clone(),
        }
    }

    /// Copy without source-private categories. A result left with no
    /// category is filed under the fallback.
    pub fn without_custom_categories(&self) -> Self {
        let mut categories = strip_custom(&self.categories);
        if categories.is_empty() {
            categories.push(FALLBACK_CATEGORY);
        }
        Self {
            categories,
            ..self.clone()
        }
    }

    /// Download reference preferred by clients: link, else magnet.
    pub fn download_url(&self) -> Option<&str> {
        self.link.as_deref().or(self.magnet_uri.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{CategoryMapping, FALLBACK_CATEGORY};
    use crate::testing::MockSource;

    fn descriptor() -> SourceDescriptor {
        let source = MockSource::new("alpha").with_categories(vec![
            CategoryMapping::new(1, vec![2000]),
            CategoryMapping::new(2, vec![2040, 100_002]),
            CategoryMapping::new(3, vec![]).with_parent(1),
        ]);
        SourceDescriptor::from_source(&source, true).unwrap()
    }

    fn item(categories: Vec<u32>) -> RawItem {
        RawItem {
            title: "Some.Movie.2024".to_string(),
            categories,
            ..Default::default()
        }
    }

    #[test]
    fn test_from_raw_maps_categories() {
        let release = ReleaseInfo::from_raw(item(vec![2, 3]), &descriptor());
        assert_eq!(release.categories, vec![2040, 100_002, 2000]);
        assert_eq!(release.source_id, "alpha");
        assert_eq!(release.source_name, "alpha");
    }

    #[test]
    fn test_from_raw_fallback() {
        let release = ReleaseInfo::from_raw(item(vec![77]), &descriptor());
        assert_eq!(release.categories, vec![FALLBACK_CATEGORY]);

        let release = ReleaseInfo::from_raw(item(vec![]), &descriptor());
        assert_eq!(release.categories, vec![FALLBACK_CATEGORY]);
    }

    #[test]
    fn test_without_custom_categories() {
        let release = ReleaseInfo::from_raw(item(vec![2]), &descriptor());
        assert_eq!(release.without_custom_categories().categories, vec![2040]);
    }

    #[test]
    fn test_private_only_categories_fall_back_when_stripped() {
        let source = MockSource::new("alpha")
            .with_categories(vec![CategoryMapping::new(9, vec![100_009])]);
        let descriptor = SourceDescriptor::from_source(&source, true).unwrap();

        let release = ReleaseInfo::from_raw(item(vec![9]), &descriptor);
        assert_eq!(release.categories, vec![100_009]);
        assert_eq!(
            release.without_custom_categories().categories,
            vec![FALLBACK_CATEGORY]
        );
    }

    #[test]
    fn test_download_url_prefers_link() {
        let mut release = ReleaseInfo::from_raw(item(vec![1]), &descriptor());
        release.magnet_uri = Some("magnet:?xt=1".to_string());
        assert_eq!(release.download_url(), Some("magnet:?xt=1"));
        release.link = Some("http://x/1.torrent".to_string());
        assert_eq!(release.download_url(), Some("http://x/1.torrent"));
    }
}
