//! Category taxonomy and per-source category mapping.
//!
//! Global ids follow the Newznab/Torznab numbering (`2000` Movies, `2040`
//! Movies/HD, ...). Each source declares how its own numbering maps onto it.

mod mapper;
mod taxonomy;

pub use mapper::{CategoryError, CategoryMap, CategoryMapping, MappingOrigin};
pub use taxonomy::{
    is_custom, strip_custom, Category, CategoryTaxonomy, CUSTOM_CATEGORY_OFFSET,
    FALLBACK_CATEGORY,
};
