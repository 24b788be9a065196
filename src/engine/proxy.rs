//! engine::proxy
//!
//! Recipe retrieval for the graph builder.
//!
//! # Lookup Order
//!
//! 1. The per-call [`RecipeCache`]
//! 2. The local package cache (a dirty export is wiped and treated as missing)
//! 3. The remotes allowed by the policy, in priority order
//!
//! The outcome is an explicit [`RecipeLookup`]; "not found" is a value, not
//! an error, so the builder decides how to report it.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use super::Session;
use crate::core::metadata::StoreError;
use crate::core::ops::{
    create_staging, discard_staging, install_staged, recover_if_dirty, remove_dir_if_exists,
    CacheError,
};
use crate::core::reference::Reference;
use crate::range::UpdatePolicy;
use crate::recipe::{Recipe, RecipeError};
use crate::remote::{Remote, RemoteError};

/// Errors while looking a recipe up.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Recipe(#[from] RecipeError),
}

/// Where a recipe was found.
#[derive(Debug, Clone)]
pub enum RecipeLookup {
    FoundLocally {
        reference: Reference,
        recipe: Arc<dyn Recipe>,
    },
    FoundRemotely {
        reference: Reference,
        recipe: Arc<dyn Recipe>,
        remote: String,
    },
    NotFound,
}

/// Recipes loaded during one resolution call.
///
/// Created by the caller, passed through the builder and dropped with it;
/// nothing is shared between calls.
#[derive(Debug, Default)]
pub struct RecipeCache {
    loaded: HashMap<Reference, RecipeLookup>,
}

impl RecipeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }
}

/// Find the recipe of `reference`, retrieving it from a remote if needed.
pub async fn lookup_recipe(
    session: &Session<'_>,
    reference: &Reference,
    policy: &UpdatePolicy,
    recipes: &mut RecipeCache,
) -> Result<RecipeLookup, LookupError> {
    let key = reference.without_revision();
    if let Some(found) = recipes.loaded.get(&key) {
        let pinned_elsewhere = match (reference.revision(), found_reference(found)) {
            (Some(wanted), Some(held)) => held.revision() != Some(wanted),
            _ => false,
        };
        if !pinned_elsewhere {
            return Ok(found.clone());
        }
    }

    let lookup = match lookup_local(session, reference)? {
        Some(found) => found,
        None => lookup_remote(session, reference, policy).await?,
    };
    if !matches!(lookup, RecipeLookup::NotFound) {
        recipes.loaded.insert(key, lookup.clone());
    }
    Ok(lookup)
}

fn found_reference(lookup: &RecipeLookup) -> Option<&Reference> {
    match lookup {
        RecipeLookup::FoundLocally { reference, .. }
        | RecipeLookup::FoundRemotely { reference, .. } => Some(reference),
        RecipeLookup::NotFound => None,
    }
}

fn lookup_local(
    session: &Session<'_>,
    reference: &Reference,
) -> Result<Option<RecipeLookup>, LookupError> {
    let paths = session.cache.layout_for(reference);
    recover_if_dirty(&paths.export())?;
    if !paths.has_recipe() {
        return Ok(None);
    }

    let metadata = session.cache.metadata(reference).load()?;
    let held = metadata.recipe.revision;
    if let Some(wanted) = reference.revision() {
        if held.as_deref() != Some(wanted) {
            debug!(reference = %reference.full_text(), held = ?held, "local revision differs");
            return Ok(None);
        }
    }

    let recipe = session.loader.load(&paths.recipe_file())?;
    let resolved = match held {
        Some(revision) => reference.with_revision(revision),
        None => reference.without_revision(),
    };
    debug!(reference = %resolved.full_text(), "recipe found locally");
    Ok(Some(RecipeLookup::FoundLocally {
        reference: resolved,
        recipe,
    }))
}

async fn lookup_remote(
    session: &Session<'_>,
    reference: &Reference,
    policy: &UpdatePolicy,
) -> Result<RecipeLookup, LookupError> {
    for remote in session.remotes.candidates(policy.remote.as_deref())? {
        if let Some((reference, recipe)) = retrieve_recipe(session, reference, remote).await? {
            return Ok(RecipeLookup::FoundRemotely {
                reference,
                recipe,
                remote: remote.name.clone(),
            });
        }
    }
    Ok(RecipeLookup::NotFound)
}

/// Fetch the recipe of `reference` from `remote` into the cache.
///
/// The export folder is replaced atomically and the metadata records the
/// retrieved revision and the remote. Bundled sources of a different
/// revision are dropped. `None` when the remote does not hold the recipe.
pub(crate) async fn retrieve_recipe(
    session: &Session<'_>,
    reference: &Reference,
    remote: &Remote,
) -> Result<Option<(Reference, Arc<dyn Recipe>)>, LookupError> {
    let paths = session.cache.layout_for(reference);
    let export = paths.export();

    let staging = create_staging(&export)?;
    let retrieved = match session.manager.get_recipe(reference, remote, &staging).await {
        Ok(retrieved) => retrieved,
        Err(RemoteError::NotFound(what)) => {
            discard_staging(&staging);
            debug!(remote = %remote.name, %what, "recipe not in remote");
            return Ok(None);
        }
        Err(e) => {
            discard_staging(&staging);
            return Err(e.into());
        }
    };
    install_staged(&staging, &export)?;

    let revision = retrieved.reference.revision().map(str::to_string);
    session
        .cache
        .metadata(reference)
        .update(|meta| -> Result<(), LookupError> {
            if meta.recipe.revision != revision {
                // Sources of another revision must not be mixed in.
                let sources = paths.export_sources();
                remove_dir_if_exists(&sources).map_err(|e| CacheError::io(&sources, e))?;
            }
            meta.recipe.revision = revision.clone();
            meta.recipe.remote = Some(remote.name.clone());
            Ok(())
        })?;

    let recipe = session.loader.load(&paths.recipe_file())?;
    info!(reference = %retrieved.reference.full_text(), remote = %remote.name, "recipe retrieved");
    Ok(Some((retrieved.reference, recipe)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::PackageCache;
    use crate::core::paths::RECIPE_FILE;
    use crate::recipe::TomlRecipeLoader;
    use crate::remote::mock::MockRemote;
    use crate::remote::{Remote, Remotes};
    use std::fs;
    use tempfile::TempDir;

    fn say() -> Reference {
        Reference::parse("say/0.1@myuser/testing").unwrap()
    }

    #[tokio::test]
    async fn local_then_memoised() {
        let temp = TempDir::new().unwrap();
        let cache = PackageCache::new(temp.path());
        let paths = cache.layout_for(&say());
        fs::create_dir_all(paths.export()).unwrap();
        fs::write(paths.export().join(RECIPE_FILE), "[recipe]\n").unwrap();

        let remotes = Remotes::default();
        let mock = MockRemote::new();
        let loader = TomlRecipeLoader::new();
        let session = Session::new(&cache, &remotes, &mock, &loader);
        let mut recipes = RecipeCache::new();

        let found = lookup_recipe(&session, &say(), &UpdatePolicy::local(), &mut recipes)
            .await
            .unwrap();
        assert!(matches!(found, RecipeLookup::FoundLocally { .. }));
        assert_eq!(recipes.len(), 1);

        // Second lookup is served from the per-call cache even if the file vanished
        fs::remove_dir_all(paths.export()).unwrap();
        let again = lookup_recipe(&session, &say(), &UpdatePolicy::local(), &mut recipes)
            .await
            .unwrap();
        assert!(matches!(again, RecipeLookup::FoundLocally { .. }));
    }

    #[tokio::test]
    async fn remote_fallback_records_metadata() {
        let temp = TempDir::new().unwrap();
        let cache = PackageCache::new(temp.path());
        let remotes = Remotes::new(vec![
            Remote::new("first", "mock://1"),
            Remote::new("second", "mock://2"),
        ]);
        let mock = MockRemote::new();
        mock.add_recipe("second", &say(), "[recipe]\n");
        let loader = TomlRecipeLoader::new();
        let session = Session::new(&cache, &remotes, &mock, &loader);

        let found = lookup_recipe(&session, &say(), &UpdatePolicy::local(), &mut RecipeCache::new())
            .await
            .unwrap();
        match found {
            RecipeLookup::FoundRemotely { reference, remote, .. } => {
                assert_eq!(remote, "second");
                assert!(reference.revision().is_some());
            }
            other => panic!("unexpected lookup {:?}", other),
        }

        let meta = cache.metadata(&say()).load().unwrap();
        assert_eq!(meta.recipe.remote.as_deref(), Some("second"));
        assert_eq!(meta.recipe.revision, mock.recipe_revision("second", &say()));
        assert!(cache.layout_for(&say()).has_recipe());
    }

    #[tokio::test]
    async fn not_found_anywhere() {
        let temp = TempDir::new().unwrap();
        let cache = PackageCache::new(temp.path());
        let remotes = Remotes::new(vec![Remote::new("first", "mock://1")]);
        let mock = MockRemote::new();
        let loader = TomlRecipeLoader::new();
        let session = Session::new(&cache, &remotes, &mock, &loader);

        let found = lookup_recipe(&session, &say(), &UpdatePolicy::local(), &mut RecipeCache::new())
            .await
            .unwrap();
        assert!(matches!(found, RecipeLookup::NotFound));
        // Nothing was left behind by the failed attempt
        assert!(!cache.layout_for(&say()).base().exists()
            || fs::read_dir(cache.layout_for(&say()).base()).unwrap().count() == 0);
    }

    #[tokio::test]
    async fn transport_errors_abort() {
        let temp = TempDir::new().unwrap();
        let cache = PackageCache::new(temp.path());
        let remotes = Remotes::new(vec![Remote::new("first", "mock://1")]);
        let mock = MockRemote::new().fail_on(crate::remote::mock::FailOn::GetRecipe(
            RemoteError::Network("down".into()),
        ));
        let loader = TomlRecipeLoader::new();
        let session = Session::new(&cache, &remotes, &mock, &loader);

        let err = lookup_recipe(&session, &say(), &UpdatePolicy::local(), &mut RecipeCache::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::Remote(RemoteError::Network(_))));
    }
}
