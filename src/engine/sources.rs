//! engine::sources
//!
//! Lazy completion of bundled sources and the working source folder.
//!
//! # Completion
//!
//! Bundled sources (`export_source/`) are the bulky part of a recipe and are
//! not retrieved with it. [`complete_sources`] fetches them on demand from
//! the remote the recipe came from, pinned at the recorded recipe revision,
//! so the sources always match the recipe they belong to.
//!
//! # Working Folder
//!
//! [`config_source`] assembles `source/` from `export/` and
//! `export_source/`, or from a captured local working copy when the recipe
//! was exported with SCM capture. The folder is rebuilt when it was left
//! dirty, and always when a local working copy is referenced.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::Session;
use crate::core::metadata::StoreError;
use crate::core::ops::{
    create_staging, discard_staging, install_dir, install_staged, merge_directories,
    recover_if_dirty, CacheError,
};
use crate::core::paths::CachePaths;
use crate::core::reference::Reference;
use crate::recipe::RecipeError;
use crate::remote::RemoteError;

/// Errors from source completion.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Sources are needed but no known remote can provide them.
    #[error("sources of '{0}' are not in the cache and no known remote holds them")]
    SourceUnavailable(Reference),

    #[error("recipe '{0}' is not in the cache")]
    RecipeMissing(Reference),

    #[error(transparent)]
    Recipe(#[from] RecipeError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// What [`complete_sources`] had to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcesOutcome {
    AlreadyPresent,
    /// The recipe bundles nothing; an empty folder was created.
    CreatedEmpty,
    Fetched { remote: String },
}

/// State of the working source folder after [`config_source`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    /// An intact folder was kept as is.
    Reused(PathBuf),
    /// Rebuilt from the exported recipe and its sources.
    Built(PathBuf),
    /// Rebuilt from the captured local working copy.
    FromLocalFolder(PathBuf),
}

impl SourceConfig {
    /// Real location of the folder.
    pub fn path(&self) -> &Path {
        match self {
            SourceConfig::Reused(path)
            | SourceConfig::Built(path)
            | SourceConfig::FromLocalFolder(path) => path,
        }
    }
}

/// Make sure the bundled sources of `reference` are in the cache.
///
/// # Errors
///
/// - [`SourceError::SourceUnavailable`] when the sources are missing and the
///   recorded remote is absent or unknown
/// - [`SourceError::Remote`] when the fetch itself fails; nothing is left
///   behind in that case
pub async fn complete_sources(
    session: &Session<'_>,
    reference: &Reference,
) -> Result<SourcesOutcome, SourceError> {
    let paths = session.cache.layout_for(reference);
    let target = paths.export_sources();
    recover_if_dirty(&target)?;

    if target.is_dir() {
        return Ok(SourcesOutcome::AlreadyPresent);
    }
    if !paths.has_recipe() {
        return Err(SourceError::RecipeMissing(reference.clone()));
    }

    let recipe = session.loader.load(&paths.recipe_file())?;
    if !recipe.declares_bundled_sources() {
        fs::create_dir_all(&target).map_err(|e| CacheError::io(&target, e))?;
        debug!(%reference, "no bundled sources declared");
        return Ok(SourcesOutcome::CreatedEmpty);
    }

    let metadata = session.cache.metadata(reference).load()?;
    let remote = metadata
        .recipe
        .remote
        .as_deref()
        .and_then(|name| session.remotes.get(name))
        .ok_or_else(|| SourceError::SourceUnavailable(reference.clone()))?;
    let pinned = match metadata.recipe.revision {
        Some(revision) => reference.with_revision(revision),
        None => reference.without_revision(),
    };

    let staging = create_staging(&target)?;
    if let Err(e) = session
        .manager
        .get_recipe_sources(&pinned, remote, &staging)
        .await
    {
        discard_staging(&staging);
        return Err(e.into());
    }
    install_staged(&staging, &target)?;

    info!(reference = %pinned.full_text(), remote = %remote.name, "sources retrieved");
    Ok(SourcesOutcome::Fetched {
        remote: remote.name.clone(),
    })
}

/// Materialise the working `source/` folder of `reference`.
pub async fn config_source(
    session: &Session<'_>,
    reference: &Reference,
) -> Result<SourceConfig, SourceError> {
    let plain = session.cache.layout_for(reference);
    if !plain.has_recipe() {
        return Err(SourceError::RecipeMissing(reference.clone()));
    }
    let recipe = session.loader.load(&plain.recipe_file())?;
    let paths = session
        .cache
        .layout_for_recipe(reference, recipe.uses_short_paths());

    let real = paths.source();
    let was_dirty = recover_if_dirty(&real)?;
    let local = read_scm_pointer(&paths)?.filter(|local| {
        let exists = local.is_dir();
        if !exists {
            warn!(%reference, path = %local.display(), "recorded working copy is gone, ignoring it");
        }
        exists
    });

    if local.is_none() && !was_dirty && real.is_dir() {
        debug!(path = %real.display(), "reusing source folder");
        return Ok(SourceConfig::Reused(real));
    }

    if let Some(local) = local {
        let real = prepare(&paths)?;
        install_dir(&real, |tmp| -> Result<(), CacheError> {
            merge_directories(&local, tmp).map_err(|e| CacheError::io(&local, e))
        })?;
        info!(%reference, from = %local.display(), "source folder taken from local working copy");
        return Ok(SourceConfig::FromLocalFolder(real));
    }

    complete_sources(session, reference).await?;
    let real = prepare(&paths)?;
    let export = paths.export();
    let export_sources = paths.export_sources();
    install_dir(&real, |tmp| -> Result<(), CacheError> {
        merge_directories(&export, tmp).map_err(|e| CacheError::io(&export, e))?;
        merge_directories(&export_sources, tmp).map_err(|e| CacheError::io(&export_sources, e))
    })?;
    info!(%reference, path = %real.display(), "source folder built");
    Ok(SourceConfig::Built(real))
}

fn prepare(paths: &CachePaths) -> Result<PathBuf, CacheError> {
    let cache_side = paths.source_cache_side();
    paths
        .prepare_dir(&cache_side)
        .map_err(|e| CacheError::io(&cache_side, e))
}

/// Local folder recorded at export time, if any.
pub(crate) fn read_scm_pointer(paths: &CachePaths) -> Result<Option<PathBuf>, CacheError> {
    let pointer = paths.scm_pointer();
    match fs::read_to_string(&pointer) {
        Ok(text) if !text.trim().is_empty() => Ok(Some(PathBuf::from(text.trim()))),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CacheError::io(pointer, e)),
    }
}
