//! The global (Newznab/Torznab) category tree.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ids at or above this value are private to a single source.
pub const CUSTOM_CATEGORY_OFFSET: u32 = 100_000;

/// Root category every unmapped local category falls back to.
pub const FALLBACK_CATEGORY: u32 = 8000;

/// A node in the global category tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<u32>,
}

const STANDARD_CATEGORIES: &[(u32, &str)] = &[
    (1000, "Console"),
    (1010, "Console/NDS"),
    (1020, "Console/PSP"),
    (1030, "Console/Wii"),
    (1040, "Console/XBox"),
    (1050, "Console/XBox 360"),
    (1060, "Console/Wiiware"),
    (1070, "Console/XBox 360 DLC"),
    (1080, "Console/PS3"),
    (1090, "Console/Other"),
    (1110, "Console/3DS"),
    (1120, "Console/PS Vita"),
    (1130, "Console/WiiU"),
    (1140, "Console/XBox One"),
    (1180, "Console/PS4"),
    (2000, "Movies"),
    (2010, "Movies/Foreign"),
    (2020, "Movies/Other"),
    (2030, "Movies/SD"),
    (2040, "Movies/HD"),
    (2045, "Movies/UHD"),
    (2050, "Movies/BluRay"),
    (2060, "Movies/3D"),
    (2070, "Movies/DVD"),
    (2080, "Movies/WEB-DL"),
    (2090, "Movies/x265"),
    (3000, "Audio"),
    (3010, "Audio/MP3"),
    (3020, "Audio/Video"),
    (3030, "Audio/Audiobook"),
    (3040, "Audio/Lossless"),
    (3050, "Audio/Other"),
    (3060, "Audio/Foreign"),
    (4000, "PC"),
    (4010, "PC/0day"),
    (4020, "PC/ISO"),
    (4030, "PC/Mac"),
    (4040, "PC/Mobile-Other"),
    (4050, "PC/Games"),
    (4060, "PC/Mobile-iOS"),
    (4070, "PC/Mobile-Android"),
    (5000, "TV"),
    (5010, "TV/WEB-DL"),
    (5020, "TV/Foreign"),
    (5030, "TV/SD"),
    (5040, "TV/HD"),
    (5045, "TV/UHD"),
    (5050, "TV/Other"),
    (5060, "TV/Sport"),
    (5070, "TV/Anime"),
    (5080, "TV/Documentary"),
    (5090, "TV/x265"),
    (6000, "XXX"),
    (6010, "XXX/DVD"),
    (6020, "XXX/WMV"),
    (6030, "XXX/XviD"),
    (6040, "XXX/x264"),
    (6045, "XXX/UHD"),
    (6050, "XXX/Pack"),
    (6060, "XXX/ImageSet"),
    (6070, "XXX/Other"),
    (6080, "XXX/SD"),
    (6090, "XXX/WEB-DL"),
    (7000, "Books"),
    (7010, "Books/Mags"),
    (7020, "Books/EBook"),
    (7030, "Books/Comics"),
    (7040, "Books/Technical"),
    (7050, "Books/Other"),
    (7060, "Books/Foreign"),
    (8000, "Other"),
    (8010, "Other/Misc"),
    (8020, "Other/Hashed"),
];

static STANDARD: Lazy<CategoryTaxonomy> = Lazy::new(|| {
    let categories = STANDARD_CATEGORIES
        .iter()
        .map(|&(id, name)| {
            let parent = (id % 1000 != 0).then(|| id - id % 1000);
            (
                id,
                Category {
                    id,
                    name: name.to_string(),
                    parent,
                },
            )
        })
        .collect();
    CategoryTaxonomy { categories }
});

/// The shared category tree.
#[derive(Debug, Clone)]
pub struct CategoryTaxonomy {
    categories: BTreeMap<u32, Category>,
}

impl CategoryTaxonomy {
    /// The standard Newznab/Torznab taxonomy.
    pub fn standard() -> &'static CategoryTaxonomy {
        &STANDARD
    }

    pub fn get(&self, id: u32) -> Option<&Category> {
        self.categories.get(&id)
    }

    pub fn is_known(&self, id: u32) -> bool {
        self.categories.contains_key(&id)
    }

    pub fn parent_of(&self, id: u32) -> Option<u32> {
        self.categories.get(&id).and_then(|c| c.parent)
    }

    /// Top-level categories in id order.
    pub fn roots(&self) -> impl Iterator<Item = &Category> {
        self.categories.values().filter(|c| c.parent.is_none())
    }

    /// Direct children of a category in id order.
    pub fn children(&self, id: u32) -> impl Iterator<Item = &Category> {
        self.categories
            .values()
            .filter(move |c| c.parent == Some(id))
    }

    /// Display name, including a synthetic one for source-private ids.
    pub fn name_of(&self, id: u32) -> String {
        match self.categories.get(&id) {
            Some(category) => category.name.clone(),
            None if is_custom(id) => format!("Custom/{}", id - CUSTOM_CATEGORY_OFFSET),
            None => format!("Unknown/{}", id),
        }
    }
}

/// Whether the id belongs to the source-private range.
pub fn is_custom(id: u32) -> bool {
    id >= CUSTOM_CATEGORY_OFFSET
}

/// Drop source-private ids, keeping order.
pub fn strip_custom(ids: &[u32]) -> Vec<u32> {
    ids.iter().copied().filter(|id| !is_custom(*id)).collect()
}
