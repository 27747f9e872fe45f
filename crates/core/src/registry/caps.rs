//! Torznab capability documents (`t=caps`).

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::category::{is_custom, CategoryTaxonomy};
use crate::source::SearchMode;

use super::SourceDescriptor;

/// Result limits advertised to clients.
pub const CAPS_LIMIT_DEFAULT: usize = 100;
pub const CAPS_LIMIT_MAX: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModeCaps {
    pub mode: SearchMode,
    pub available: bool,
    pub supported_params: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapsCategory {
    pub id: u32,
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subcats: Vec<CapsCategory>,
}

/// What a scope can answer, in the shape of a Torznab caps document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TorznabCaps {
    pub limit_default: usize,
    pub limit_max: usize,
    pub searching: Vec<ModeCaps>,
    pub categories: Vec<CapsCategory>,
}

impl TorznabCaps {
    /// Caps of a single source, including its custom categories.
    pub fn for_source(descriptor: &SourceDescriptor) -> Self {
        Self::build(std::iter::once(descriptor), true)
    }

    /// Union over several sources. Custom categories are omitted since they
    /// mean something different at every source.
    pub fn merged<'a>(descriptors: impl IntoIterator<Item = &'a SourceDescriptor>) -> Self {
        Self::build(descriptors, false)
    }

    fn build<'a>(
        descriptors: impl IntoIterator<Item = &'a SourceDescriptor>,
        keep_custom: bool,
    ) -> Self {
        let taxonomy = CategoryTaxonomy::standard();
        let mut modes = BTreeSet::new();
        let mut tree: BTreeMap<u32, BTreeSet<u32>> = BTreeMap::new();
        let mut custom: BTreeMap<u32, String> = BTreeMap::new();

        for descriptor in descriptors {
            modes.extend(descriptor.modes.iter().map(|m| m.torznab_name()));
            for global in descriptor.categories.global_ids() {
                if is_custom(global) {
                    if keep_custom {
                        let name = descriptor
                            .categories
                            .description_for(global)
                            .map(str::to_string)
                            .unwrap_or_else(|| taxonomy.name_of(global));
                        custom.entry(global).or_insert(name);
                    }
                    continue;
                }
                match taxonomy.parent_of(global) {
                    Some(parent) => {
                        tree.entry(parent).or_default().insert(global);
                    }
                    None => {
                        tree.entry(global).or_default();
                    }
                }
            }
        }

        let searching = SearchMode::ALL
            .into_iter()
            .map(|mode| {
                let available = modes.contains(mode.torznab_name());
                ModeCaps {
                    mode,
                    available,
                    supported_params: if available {
                        mode.supported_params().to_vec()
                    } else {
                        Vec::new()
                    },
                }
            })
            .collect();

        let mut categories: Vec<CapsCategory> = tree
            .into_iter()
            .map(|(root, children)| CapsCategory {
                id: root,
                name: taxonomy.name_of(root),
                subcats: children
                    .into_iter()
                    .map(|id| CapsCategory {
                        id,
                        name: taxonomy.name_of(id),
                        subcats: Vec::new(),
                    })
                    .collect(),
            })
            .collect();
        categories.extend(custom.into_iter().map(|(id, name)| CapsCategory {
            id,
            name,
            subcats: Vec::new(),
        }));

        Self {
            limit_default: CAPS_LIMIT_DEFAULT,
            limit_max: CAPS_LIMIT_MAX,
            searching,
            categories,
        }
    }
}
