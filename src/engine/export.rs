//! engine::export
//!
//! Export a recipe folder into the cache.
//!
//! # Layout
//!
//! - `recipe.toml` and the files matched by `exports` go to `export/`
//! - files matched by `exports_sources` go to `export_source/`
//! - `export/manifest.txt` lists both, sources under `export_source/`
//!
//! The recipe revision is the manifest revision unless one is pinned by the
//! caller. Exporting identical content twice yields the same revision and
//! keeps the working source folder; a new revision drops it.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::Session;
use crate::core::manifest::FileManifest;
use crate::core::metadata::StoreError;
use crate::core::ops::{install_dir, remove_dir_if_exists, CacheError};
use crate::core::paths::RECIPE_FILE;
use crate::core::reference::Reference;
use crate::recipe::RecipeError;

/// Errors from exporting a recipe.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no recipe file at '{}'", .0.display())]
    RecipeMissing(PathBuf),

    #[error("invalid export pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error(transparent)]
    Recipe(#[from] RecipeError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of an export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    /// The exported reference, pinned at its revision.
    pub reference: Reference,
    /// Whether the revision differs from the one previously held.
    pub revision_changed: bool,
    /// Files in the export manifest.
    pub files: usize,
}

/// Export the recipe in `source_dir` as `reference`.
pub fn export_recipe(
    session: &Session<'_>,
    source_dir: &Path,
    reference: &Reference,
    pinned_revision: Option<&str>,
) -> Result<ExportOutcome, ExportError> {
    let recipe_path = source_dir.join(RECIPE_FILE);
    if !recipe_path.is_file() {
        return Err(ExportError::RecipeMissing(recipe_path));
    }
    let recipe = session.loader.load(&recipe_path)?;
    let paths = session
        .cache
        .layout_for_recipe(reference, recipe.uses_short_paths());

    let mut exported = vec![PathBuf::from(RECIPE_FILE)];
    exported.extend(matched_files(source_dir, &recipe.exports())?);
    let sources = matched_files(source_dir, &recipe.exports_sources())?;

    let source_manifest =
        install_dir(&paths.export_sources(), |tmp| -> Result<FileManifest, CacheError> {
            copy_selected(source_dir, &sources, tmp)?;
            FileManifest::from_dir(tmp).map_err(|e| CacheError::io(tmp, e))
        })?;

    let manifest = install_dir(&paths.export(), |tmp| -> Result<FileManifest, CacheError> {
        copy_selected(source_dir, &exported, tmp)?;
        let mut manifest = FileManifest::from_dir(tmp).map_err(|e| CacheError::io(tmp, e))?;
        manifest.extend_prefixed("export_source", &source_manifest);
        manifest.save(tmp).map_err(|e| CacheError::io(tmp, e))?;
        Ok(manifest)
    })?;

    let revision = pinned_revision
        .map(str::to_string)
        .unwrap_or_else(|| manifest.revision());

    let previous = session
        .cache
        .metadata(reference)
        .update(|meta| -> Result<_, StoreError> {
            let previous = meta.recipe.revision.replace(revision.clone());
            meta.recipe.remote = None;
            Ok(previous)
        })?;
    let revision_changed = previous.as_deref() != Some(revision.as_str());
    if revision_changed {
        let source = paths.source();
        remove_dir_if_exists(&source).map_err(|e| CacheError::io(&source, e))?;
        debug!(%reference, previous = ?previous, "revision changed, source folder dropped");
    }

    let pointer = paths.scm_pointer();
    if recipe.scm().captures_local_folder() {
        let local = source_dir
            .canonicalize()
            .map_err(|e| CacheError::io(source_dir, e))?;
        fs::write(&pointer, local.to_string_lossy().as_bytes())
            .map_err(|e| CacheError::io(&pointer, e))?;
    } else if pointer.exists() {
        fs::remove_file(&pointer).map_err(|e| CacheError::io(&pointer, e))?;
    }

    let reference = reference.with_revision(revision);
    info!(reference = %reference.full_text(), files = manifest.len(), "recipe exported");
    Ok(ExportOutcome {
        reference,
        revision_changed,
        files: manifest.len(),
    })
}

/// Files below `root` matched by `patterns`, relative to `root`.
///
/// A pattern matching a folder selects everything below it.
fn matched_files(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, ExportError> {
    let mut files = Vec::new();
    for pattern in patterns {
        let full = root.join(pattern);
        let entries = glob::glob(&full.to_string_lossy()).map_err(|e| ExportError::Pattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        for entry in entries {
            let path = entry.map_err(|e| ExportError::Pattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            for found in WalkDir::new(&path).follow_links(false) {
                let found = found.map_err(|e| ExportError::Pattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?;
                if found.file_type().is_dir() {
                    continue;
                }
                if let Ok(relative) = found.path().strip_prefix(root) {
                    files.push(relative.to_path_buf());
                }
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn copy_selected(root: &Path, files: &[PathBuf], dest: &Path) -> Result<(), CacheError> {
    for relative in files {
        let from = root.join(relative);
        let to = dest.join(relative);
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;
        }
        let meta = fs::symlink_metadata(&from).map_err(|e| CacheError::io(&from, e))?;
        if meta.file_type().is_symlink() {
            let link = fs::read_link(&from).map_err(|e| CacheError::io(&from, e))?;
            symlink(&link, &to).map_err(|e| CacheError::io(&to, e))?;
        } else {
            fs::copy(&from, &to).map_err(|e| CacheError::io(&from, e))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(link, target)
}

#[cfg(windows)]
fn symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(link, target)
}
