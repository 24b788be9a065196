//! engine::copy
//!
//! Promotion of a recipe and its binaries to another user/channel.
//!
//! # Procedure
//!
//! 1. Complete the bundled sources of the origin (they travel with the copy)
//! 2. Copy `export/` and `export_source/`, asking before overwriting an
//!    existing destination unless forced; declining skips the whole copy
//! 3. Copy each selected binary, asking per binary; declining skips just
//!    that binary
//! 4. Record the recipe revision and every copied binary's revision in the
//!    destination metadata
//!
//! Every destination folder is built in a temporary sibling and renamed
//! into place, with symbolic links preserved.

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use super::sources::{complete_sources, SourceError};
use super::Session;
use crate::core::manifest::FileManifest;
use crate::core::metadata::StoreError;
use crate::core::ops::{install_dir, merge_directories, CacheError};
use crate::core::reference::{PackageReference, Reference, ReferenceError};
use crate::recipe::RecipeError;

/// Errors from copying.
#[derive(Debug, Error)]
pub enum CopyError {
    #[error("recipe '{0}' is not in the cache")]
    ExportMissing(Reference),

    #[error("package '{package_id}' of '{reference}' is not in the cache")]
    PackageMissing {
        reference: Reference,
        package_id: String,
    },

    #[error("cannot complete sources before copying: {0}")]
    Sources(#[from] SourceError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Recipe(#[from] RecipeError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Yes/no questions asked before overwriting.
pub trait Confirm {
    fn confirm(&self, question: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, question: &str) -> bool {
        self(question)
    }
}

/// Binaries to copy along with the recipe.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PackageSelection {
    #[default]
    None,
    /// Everything installed for the origin.
    All,
    Ids(Vec<String>),
}

/// What a copy did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyReport {
    /// Destination reference.
    pub reference: Option<Reference>,
    /// False when the user declined overwriting the destination recipe.
    pub recipe_copied: bool,
    pub packages_copied: Vec<String>,
    pub packages_skipped: Vec<String>,
}

/// Copy `reference` to `user/channel`.
pub async fn copy_package(
    session: &Session<'_>,
    reference: &Reference,
    user: &str,
    channel: &str,
    selection: &PackageSelection,
    force: bool,
    confirm: &dyn Confirm,
) -> Result<CopyReport, CopyError> {
    let origin = session.cache.layout_for(reference);
    if !origin.has_recipe() {
        return Err(CopyError::ExportMissing(reference.clone()));
    }
    complete_sources(session, reference).await?;

    let recipe = session.loader.load(&origin.recipe_file())?;
    let short = recipe.uses_short_paths();
    let origin = session.cache.layout_for_recipe(reference, short);
    let dest_ref = reference.without_revision().with_user_channel(user, channel)?;
    let dest = session.cache.layout_for_recipe(&dest_ref, short);

    let ids = match selection {
        PackageSelection::None => Vec::new(),
        PackageSelection::All => session.cache.list_packages(reference)?,
        PackageSelection::Ids(ids) => ids.clone(),
    };
    for id in &ids {
        PackageReference::new(reference.without_revision(), id.as_str())?;
    }

    let mut report = CopyReport {
        reference: Some(dest_ref.clone()),
        ..CopyReport::default()
    };

    if dest.has_recipe()
        && !force
        && !confirm.confirm(&format!("'{}' already exists. Overwrite?", dest_ref))
    {
        info!(destination = %dest_ref, "copy declined");
        return Ok(report);
    }

    replace_with(&origin.export(), &dest.export())?;
    replace_with(&origin.export_sources(), &dest.export_sources())?;
    report.recipe_copied = true;

    let origin_meta = session.cache.metadata(reference).load()?;
    let recipe_revision = origin_meta.recipe.revision.clone();

    let mut copied = Vec::new();
    for id in ids {
        let from = origin.package(&id);
        if !from.is_dir() {
            return Err(CopyError::PackageMissing {
                reference: reference.clone(),
                package_id: id,
            });
        }

        let cache_side = dest.package_cache_side(&id);
        let to = dest.package(&id);
        let question = format!("Package '{}' of '{}' already exists. Overwrite?", id, dest_ref);
        if to.is_dir() && !force && !confirm.confirm(&question) {
            debug!(package = %id, "package copy declined");
            report.packages_skipped.push(id);
            continue;
        }

        let to = dest
            .prepare_dir(&cache_side)
            .map_err(|e| CacheError::io(&cache_side, e))?;
        replace_with(&from, &to)?;

        let (revision, built_against) = match origin_meta.packages.get(&id) {
            Some(pkg) => (pkg.revision.clone(), pkg.recipe_revision.clone()),
            None => (None, recipe_revision.clone()),
        };
        let revision = match revision {
            Some(revision) => revision,
            None => FileManifest::from_dir(&to)
                .map_err(|e| CacheError::io(&to, e))?
                .revision(),
        };
        copied.push((id.clone(), revision, built_against));
        report.packages_copied.push(id);
    }

    session
        .cache
        .metadata(&dest_ref)
        .update(|meta| -> Result<(), StoreError> {
            meta.recipe.revision = recipe_revision.clone();
            meta.recipe.remote = None;
            for (id, revision, built_against) in &copied {
                let entry = meta.packages.entry(id.clone()).or_default();
                entry.revision = Some(revision.clone());
                entry.recipe_revision = built_against.clone();
            }
            Ok(())
        })?;

    info!(
        from = %reference,
        to = %dest_ref,
        packages = report.packages_copied.len(),
        "recipe copied"
    );
    Ok(report)
}

/// Replace `dest` with a copy of `src`.
fn replace_with(src: &Path, dest: &Path) -> Result<(), CacheError> {
    install_dir(dest, |tmp| -> Result<(), CacheError> {
        if src.exists() {
            merge_directories(src, tmp).map_err(|e| CacheError::io(src, e))?;
        }
        Ok(())
    })
}
