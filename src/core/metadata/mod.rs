//! core::metadata
//!
//! Per-entry revision bookkeeping.
//!
//! # Modules
//!
//! - [`schema`] - Metadata file types
//! - [`store`] - Scoped, atomic updates of the metadata file
//!
//! # Architecture
//!
//! One `metadata.json` per unrevisioned cache entry records the recipe
//! revision, the remote it came from, and for every binary the revision and
//! the recipe revision it was built against.

pub mod schema;
pub mod store;

// Re-export commonly used types
pub use schema::{
    MetadataError, PackageCacheMetadata, PackageMetadata, PackageStatus, RecipeMetadata,
};
pub use store::{MetadataStore, StoreError};
