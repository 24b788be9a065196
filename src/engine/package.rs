//! engine::package
//!
//! Registration of built binaries in the cache.
//!
//! A binary is installed atomically under `package/<id>/`, its content
//! revision is derived from its manifest, and the metadata records that
//! revision together with the recipe revision it was built against.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use super::Session;
use crate::core::manifest::FileManifest;
use crate::core::metadata::StoreError;
use crate::core::ops::{install_dir, merge_directories, CacheError};
use crate::core::reference::{PackageReference, Reference, ReferenceError};
use crate::recipe::RecipeError;

/// Errors from registering a binary.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("recipe '{0}' has not been exported")]
    RecipeNotExported(Reference),

    #[error("built folder '{}' does not exist", .0.display())]
    MissingFolder(PathBuf),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Recipe(#[from] RecipeError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Install the binary in `built_dir` as package `package_id` of `reference`.
///
/// Returns the package reference pinned at the binary's revision.
pub fn register_package(
    session: &Session<'_>,
    reference: &Reference,
    package_id: &str,
    built_dir: &Path,
) -> Result<PackageReference, PackageError> {
    let package = PackageReference::new(reference.without_revision(), package_id)?;
    if !built_dir.is_dir() {
        return Err(PackageError::MissingFolder(built_dir.to_path_buf()));
    }

    let plain = session.cache.layout_for(reference);
    let recipe_revision = session
        .cache
        .metadata(reference)
        .load()?
        .recipe
        .revision
        .filter(|_| plain.has_recipe())
        .ok_or_else(|| PackageError::RecipeNotExported(reference.clone()))?;

    let recipe = session.loader.load(&plain.recipe_file())?;
    let paths = session
        .cache
        .layout_for_recipe(reference, recipe.uses_short_paths());
    let cache_side = paths.package_cache_side(package_id);
    let real = paths
        .prepare_dir(&cache_side)
        .map_err(|e| CacheError::io(&cache_side, e))?;

    let revision = install_dir(&real, |tmp| -> Result<String, CacheError> {
        merge_directories(built_dir, tmp).map_err(|e| CacheError::io(built_dir, e))?;
        let manifest = FileManifest::from_dir(tmp).map_err(|e| CacheError::io(tmp, e))?;
        manifest.save(tmp).map_err(|e| CacheError::io(tmp, e))?;
        Ok(manifest.revision())
    })?;

    session
        .cache
        .metadata(reference)
        .update(|meta| -> Result<(), StoreError> {
            meta.record_package(package_id, revision.clone(), recipe_revision.clone());
            Ok(())
        })?;

    let package = package.with_revision(revision);
    info!(package = %package.full_text(), %recipe_revision, "binary registered");
    Ok(package)
}
