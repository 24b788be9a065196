//! engine::download
//!
//! Eager retrieval of a recipe, its sources and its binaries from one remote.

use thiserror::Error;
use tracing::{debug, info};

use super::proxy::{retrieve_recipe, LookupError};
use super::sources::{complete_sources, SourceError, SourcesOutcome};
use super::Session;
use crate::core::metadata::StoreError;
use crate::core::ops::{create_staging, discard_staging, install_staged, CacheError};
use crate::core::reference::{PackageReference, Reference, ReferenceError};
use crate::remote::RemoteError;

/// Errors from downloading.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("recipe '{reference}' not found in remote '{remote}'")]
    RecipeNotFound { reference: Reference, remote: String },

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Sources(#[from] SourceError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a download fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    /// The recipe, pinned at the retrieved revision.
    pub reference: Reference,
    pub sources: SourcesOutcome,
    /// Binaries fetched, pinned at their revisions.
    pub packages: Vec<PackageReference>,
}

/// Download `reference` from the remote named `remote`.
///
/// `package_ids` of `None` fetches every binary the remote lists.
pub async fn download(
    session: &Session<'_>,
    reference: &Reference,
    remote: &str,
    package_ids: Option<Vec<String>>,
    recipe_only: bool,
) -> Result<DownloadReport, DownloadError> {
    let remote = session.remotes.require(remote)?;
    let (pinned, recipe) = retrieve_recipe(session, reference, remote)
        .await?
        .ok_or_else(|| DownloadError::RecipeNotFound {
            reference: reference.clone(),
            remote: remote.name.clone(),
        })?;

    let sources = complete_sources(session, reference).await?;
    let mut report = DownloadReport {
        reference: pinned.clone(),
        sources,
        packages: Vec::new(),
    };
    if recipe_only {
        return Ok(report);
    }

    let ids = match package_ids {
        Some(ids) => ids,
        None => session.manager.search_packages(&pinned, remote).await?,
    };
    debug!(reference = %pinned.full_text(), count = ids.len(), "binaries to download");

    let paths = session
        .cache
        .layout_for_recipe(reference, recipe.uses_short_paths());
    let recipe_revision = pinned.revision().map(str::to_string);

    for id in ids {
        let package = PackageReference::new(pinned.clone(), &id)?;
        let cache_side = paths.package_cache_side(&id);
        let real = paths
            .prepare_dir(&cache_side)
            .map_err(|e| CacheError::io(&cache_side, e))?;

        let staging = create_staging(&real)?;
        let fetched = match session.manager.get_package(&package, remote, &staging).await {
            Ok(fetched) => fetched,
            Err(e) => {
                discard_staging(&staging);
                return Err(e.into());
            }
        };
        install_staged(&staging, &real)?;

        let revision = fetched.revision().map(str::to_string);
        let built_against = recipe_revision.clone();
        session
            .cache
            .metadata(reference)
            .update(|meta| -> Result<(), StoreError> {
                let entry = meta.packages.entry(id.clone()).or_default();
                entry.revision = revision;
                entry.recipe_revision = built_against;
                Ok(())
            })?;
        report.packages.push(fetched);
    }

    info!(
        reference = %pinned.full_text(),
        remote = %remote.name,
        packages = report.packages.len(),
        "download finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::PackageCache;
    use crate::core::metadata::schema::PackageStatus;
    use crate::recipe::TomlRecipeLoader;
    use crate::remote::mock::{MockOperation, MockRemote};
    use crate::remote::{Remote, Remotes};
    use tempfile::TempDir;

    fn say() -> Reference {
        Reference::parse("say/0.1@myuser/testing").unwrap()
    }

    fn published() -> MockRemote {
        let mock = MockRemote::new();
        mock.add_recipe("origin", &say(), "[recipe]\nexports_sources = [\"*.c\"]\n")
            .add_sources("origin", &say(), &[("say.c", "void say();")])
            .add_package("origin", &say(), "p1", &[("lib/libsay.a", "one")])
            .add_package("origin", &say(), "p2", &[("lib/libsay.a", "two")]);
        mock
    }

    #[tokio::test]
    async fn downloads_everything_listed() {
        let temp = TempDir::new().unwrap();
        let cache = PackageCache::new(temp.path());
        let remotes = Remotes::new(vec![Remote::new("origin", "mock://")]);
        let mock = published();
        let loader = TomlRecipeLoader::new();
        let session = Session::new(&cache, &remotes, &mock, &loader);

        let report = download(&session, &say(), "origin", None, false).await.unwrap();
        assert_eq!(
            report.sources,
            SourcesOutcome::Fetched {
                remote: "origin".into()
            }
        );
        assert_eq!(report.packages.len(), 2);

        let paths = cache.layout_for(&say());
        assert!(paths.export_sources().join("say.c").exists());
        assert!(paths.package("p2").join("lib/libsay.a").exists());

        let meta = cache.metadata(&say()).load().unwrap();
        assert_eq!(meta.recipe.remote.as_deref(), Some("origin"));
        assert_eq!(meta.package_status("p1"), PackageStatus::Current);
    }

    #[tokio::test]
    async fn recipe_only_skips_binaries() {
        let temp = TempDir::new().unwrap();
        let cache = PackageCache::new(temp.path());
        let remotes = Remotes::new(vec![Remote::new("origin", "mock://")]);
        let mock = published();
        let loader = TomlRecipeLoader::new();
        let session = Session::new(&cache, &remotes, &mock, &loader);

        let report = download(&session, &say(), "origin", None, true).await.unwrap();
        assert!(report.packages.is_empty());
        let touched_binaries = mock.operations().iter().any(|op| {
            matches!(
                op,
                MockOperation::SearchPackages { .. } | MockOperation::GetPackage { .. }
            )
        });
        assert!(!touched_binaries);
    }

    #[tokio::test]
    async fn unknown_remote_and_missing_recipe() {
        let temp = TempDir::new().unwrap();
        let cache = PackageCache::new(temp.path());
        let remotes = Remotes::new(vec![Remote::new("origin", "mock://")]);
        let mock = MockRemote::new();
        let loader = TomlRecipeLoader::new();
        let session = Session::new(&cache, &remotes, &mock, &loader);

        let err = download(&session, &say(), "nope", None, false).await.unwrap_err();
        assert!(matches!(err, DownloadError::Remote(RemoteError::UnknownRemote(_))));

        let err = download(&session, &say(), "origin", None, false).await.unwrap_err();
        assert!(matches!(err, DownloadError::RecipeNotFound { .. }));
    }
}
