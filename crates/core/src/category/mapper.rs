//! Per-source translation between local and global category ids.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use super::taxonomy::{is_custom, CategoryTaxonomy, FALLBACK_CATEGORY};

/// One row of a source's category table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMapping {
    /// Source-local category id.
    #[serde(rename = "local")]
    pub local_id: u32,
    /// Local parent category, if the source nests its categories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<u32>,
    /// The source's own label for this category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Global ids this local category maps to. Empty for structural rows
    /// that only place a local category under a mapped parent.
    #[serde(rename = "global", default)]
    pub global_ids: Vec<u32>,
}

impl CategoryMapping {
    pub fn new(local_id: u32, global_ids: Vec<u32>) -> Self {
        Self {
            local_id,
            parent: None,
            description: None,
            global_ids,
        }
    }

    pub fn with_parent(mut self, parent: u32) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Errors raised while loading a category table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CategoryError {
    #[error("Local category {local} maps to unknown global category {global}")]
    UnknownGlobalCategory { local: u32, global: u32 },

    #[error("Local category {0} has neither a global mapping nor a parent")]
    EmptyMapping(u32),
}

/// How a local id was resolved to global ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingOrigin {
    Direct,
    /// Resolved through this local ancestor.
    Ancestor(u32),
    Fallback,
}

/// A source's validated category table.
#[derive(Debug, Clone, Default)]
pub struct CategoryMap {
    mappings: Vec<CategoryMapping>,
    /// local id -> indices into `mappings`
    by_local: HashMap<u32, Vec<usize>>,
}

impl CategoryMap {
    /// Validate and index a category table.
    ///
    /// Every global id must be a standard category or a source-private id.
    pub fn new(mappings: Vec<CategoryMapping>) -> Result<Self, CategoryError> {
        let taxonomy = CategoryTaxonomy::standard();
        let mut by_local: HashMap<u32, Vec<usize>> = HashMap::new();

        for (idx, mapping) in mappings.iter().enumerate() {
            if mapping.global_ids.is_empty() && mapping.parent.is_none() {
                return Err(CategoryError::EmptyMapping(mapping.local_id));
            }
            if let Some(&global) = mapping
                .global_ids
                .iter()
                .find(|&&g| !taxonomy.is_known(g) && !is_custom(g))
            {
                return Err(CategoryError::UnknownGlobalCategory {
                    local: mapping.local_id,
                    global,
                });
            }
            by_local.entry(mapping.local_id).or_default().push(idx);
        }

        Ok(Self { mappings, by_local })
    }

    pub fn mappings(&self) -> &[CategoryMapping] {
        &self.mappings
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Translate requested global ids into this source's local ids.
    ///
    /// A requested parent category also reaches locals mapped to any of its
    /// children, and structural rows follow their mapped ancestor. Ids with
    /// no local equivalent are dropped.
    pub fn to_local(&self, global: &[u32]) -> Vec<u32> {
        let taxonomy = CategoryTaxonomy::standard();
        let mut seen = HashSet::new();
        let mut locals = Vec::new();

        for mapping in &self.mappings {
            let matches = self.to_global_if_declared(mapping).iter().any(|g| {
                global.contains(g)
                    || taxonomy
                        .parent_of(*g)
                        .is_some_and(|parent| global.contains(&parent))
            });
            if matches && seen.insert(mapping.local_id) {
                locals.push(mapping.local_id);
            }
        }

        locals
    }

    fn to_global_if_declared(&self, mapping: &CategoryMapping) -> Vec<u32> {
        if mapping.global_ids.is_empty() {
            match self.resolve(mapping.local_id) {
                (ids, MappingOrigin::Ancestor(_)) => ids,
                _ => Vec::new(),
            }
        } else {
            mapping.global_ids.clone()
        }
    }

    /// Translate a local id into global ids. Never empty.
    pub fn to_global(&self, local: u32) -> Vec<u32> {
        self.resolve(local).0
    }

    /// Like [`to_global`](Self::to_global), also reporting how the ids were found.
    pub fn resolve(&self, local: u32) -> (Vec<u32>, MappingOrigin) {
        if let Some(ids) = self.direct(local) {
            return (ids, MappingOrigin::Direct);
        }

        let mut visited = HashSet::from([local]);
        let mut current = self.parent_of(local);
        while let Some(ancestor) = current {
            if !visited.insert(ancestor) {
                break;
            }
            if let Some(ids) = self.direct(ancestor) {
                return (ids, MappingOrigin::Ancestor(ancestor));
            }
            current = self.parent_of(ancestor);
        }

        (vec![FALLBACK_CATEGORY], MappingOrigin::Fallback)
    }

    /// Distinct global ids declared by this table, in declaration order.
    pub fn global_ids(&self) -> Vec<u32> {
        let mut seen = HashSet::new();
        self.mappings
            .iter()
            .flat_map(|m| m.global_ids.iter().copied())
            .filter(|g| seen.insert(*g))
            .collect()
    }

    /// Description of the first local category mapped to `global`.
    pub fn description_for(&self, global: u32) -> Option<&str> {
        self.mappings
            .iter()
            .find(|m| m.global_ids.contains(&global))
            .and_then(|m| m.description.as_deref())
    }

    fn direct(&self, local: u32) -> Option<Vec<u32>> {
        let indices = self.by_local.get(&local)?;
        let mut seen = HashSet::new();
        let ids: Vec<u32> = indices
            .iter()
            .flat_map(|&i| self.mappings[i].global_ids.iter().copied())
            .filter(|g| seen.insert(*g))
            .collect();
        (!ids.is_empty()).then_some(ids)
    }

    fn parent_of(&self, local: u32) -> Option<u32> {
        self.by_local
            .get(&local)
            .and_then(|indices| indices.iter().find_map(|&i| self.mappings[i].parent))
    }
}
