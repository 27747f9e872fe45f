//! Testing utilities: a mock source, a manual clock and fixtures.
//!
//! Used by this crate's unit tests, the integration tests in `tests/`, and
//! the server crate's tests.

mod manual_clock;
mod mock_source;

pub use manual_clock::ManualClock;
pub use mock_source::MockSource;

pub use fixtures::{raw_item, raw_items, sample_release};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::release::ReleaseInfo;
    use crate::source::RawItem;

    /// A raw item with reasonable defaults.
    pub fn raw_item(title: &str, categories: Vec<u32>) -> RawItem {
        RawItem {
            title: title.to_string(),
            categories,
            size_bytes: Some(1024 * 1024 * 700),
            seeders: Some(25),
            peers: Some(30),
            link: Some(format!(
                "http://tracker.example/dl/{}.torrent",
                title.replace(' ', ".")
            )),
            ..Default::default()
        }
    }

    /// `count` uncategorized items titled `<prefix> item <n>`.
    pub fn raw_items(prefix: &str, count: usize) -> Vec<RawItem> {
        (0..count)
            .map(|n| raw_item(&format!("{} item {}", prefix, n), Vec::new()))
            .collect()
    }

    /// A normalized result as if reported by `source`.
    pub fn sample_release(source: &str, title: &str) -> ReleaseInfo {
        ReleaseInfo {
            title: title.to_string(),
            categories: vec![8000],
            publish_date: None,
            size_bytes: Some(1024),
            seeders: Some(1),
            peers: Some(1),
            grabs: None,
            files: None,
            link: Some(format!("http://{}.example/{}.torrent", source, title)),
            magnet_uri: None,
            info_hash: None,
            details_url: None,
            imdb_id: None,
            source_id: source.to_string(),
            source_name: source.to_string(),
        }
    }
}
