//! core::metadata::schema
//!
//! Revision bookkeeping for one cache entry.
//!
//! # File Shape
//!
//! ```json
//! {
//!   "recipe": {"revision": "<hex|null>", "remote": "<name|null>"},
//!   "packages": {
//!     "<package_id>": {"revision": "<hex|null>", "recipe_revision": "<hex|null>"}
//!   }
//! }
//! ```
//!
//! # Outdated Binaries
//!
//! A binary records the recipe revision it was built against. When that no
//! longer matches the recipe revision, the binary is *outdated*. This state
//! is legal but must be surfaced through [`PackageCacheMetadata::package_status`],
//! never hidden.
//!
//! # Example
//!
//! ```
//! use stowage::core::metadata::schema::{PackageCacheMetadata, PackageStatus};
//!
//! let mut meta = PackageCacheMetadata::default();
//! meta.recipe.revision = Some("r1".into());
//! meta.record_package("pkg1", "p1", "r1");
//! assert_eq!(meta.package_status("pkg1"), PackageStatus::Current);
//!
//! meta.recipe.revision = Some("r2".into());
//! assert!(matches!(meta.package_status("pkg1"), PackageStatus::Outdated { .. }));
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from metadata parsing.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to parse metadata: {0}")]
    ParseError(String),

    #[error("failed to serialize metadata: {0}")]
    SerializeError(String),
}

/// Recipe-level record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeMetadata {
    /// Recipe revision currently held by the entry
    pub revision: Option<String>,

    /// Remote the recipe was retrieved from
    pub remote: Option<String>,
}

/// Binary-level record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageMetadata {
    /// Content revision of the binary
    pub revision: Option<String>,

    /// Recipe revision the binary was built against
    pub recipe_revision: Option<String>,
}

/// Whole metadata file of one cache entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageCacheMetadata {
    #[serde(default)]
    pub recipe: RecipeMetadata,

    #[serde(default)]
    pub packages: BTreeMap<String, PackageMetadata>,
}

/// Relationship of a binary to the current recipe revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageStatus {
    /// Built against the current recipe revision.
    Current,
    /// Built against an older (or different) recipe revision.
    Outdated {
        built_against: Option<String>,
        current: Option<String>,
    },
    /// No record for this package id.
    Unknown,
}

impl PackageCacheMetadata {
    /// Parse the JSON form.
    pub fn from_json(json: &str) -> Result<Self, MetadataError> {
        serde_json::from_str(json).map_err(|e| MetadataError::ParseError(e.to_string()))
    }

    /// Pretty JSON form, stable field order.
    pub fn to_json(&self) -> Result<String, MetadataError> {
        serde_json::to_string_pretty(self).map_err(|e| MetadataError::SerializeError(e.to_string()))
    }

    /// Record a binary's revision and the recipe revision it was built against.
    pub fn record_package(
        &mut self,
        package_id: impl Into<String>,
        revision: impl Into<String>,
        recipe_revision: impl Into<String>,
    ) {
        let entry = self.packages.entry(package_id.into()).or_default();
        entry.revision = Some(revision.into());
        entry.recipe_revision = Some(recipe_revision.into());
    }

    /// Status of one binary against the current recipe revision.
    pub fn package_status(&self, package_id: &str) -> PackageStatus {
        match self.packages.get(package_id) {
            None => PackageStatus::Unknown,
            Some(pkg) if pkg.recipe_revision == self.recipe.revision => PackageStatus::Current,
            Some(pkg) => PackageStatus::Outdated {
                built_against: pkg.recipe_revision.clone(),
                current: self.recipe.revision.clone(),
            },
        }
    }

    /// Package ids whose recorded recipe revision differs from the current one.
    pub fn outdated_packages(&self) -> Vec<&str> {
        self.packages
            .keys()
            .filter(|id| matches!(self.package_status(id), PackageStatus::Outdated { .. }))
            .map(String::as_str)
            .collect()
    }
}
