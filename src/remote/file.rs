//! remote::file
//!
//! Remotes that are plain directories laid out like the local cache.
//!
//! A remote URL is either a filesystem path or a `file://` URL. Below it,
//! every reference lives at `<name>/<version>/<user>/<channel>/` with the
//! same `export/`, `export_source/`, `package/<id>/` and `metadata.json`
//! entries the cache uses, so a cache directory can itself serve as a
//! remote.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use walkdir::WalkDir;

use super::registry::Remote;
use super::traits::{RecipeQuery, RemoteError, RemoteManager, RetrievedRecipe};
use crate::core::cache::PackageCache;
use crate::core::manifest::FileManifest;
use crate::core::ops::merge_directories;
use crate::core::paths::CachePaths;
use crate::core::pattern::ReferencePattern;
use crate::core::reference::{PackageReference, Reference};

/// Remote manager for directory remotes.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileRemoteManager;

impl FileRemoteManager {
    pub fn new() -> Self {
        Self
    }

    fn root(remote: &Remote) -> PathBuf {
        PathBuf::from(remote.url.strip_prefix("file://").unwrap_or(&remote.url))
    }

    fn storage(remote: &Remote) -> PackageCache {
        PackageCache::new(Self::root(remote))
    }

    /// Recipe revision held by the remote: recorded in its metadata, or
    /// derived from the export content.
    fn recipe_revision(storage: &PackageCache, paths: &CachePaths) -> Result<String, RemoteError> {
        let recorded = storage
            .metadata(paths.reference())
            .load()
            .map_err(|e| RemoteError::io(&paths.metadata_file(), e))?
            .recipe
            .revision;
        match recorded {
            Some(revision) => Ok(revision),
            None => FileManifest::from_dir(&paths.export())
                .map(|m| m.revision())
                .map_err(|e| RemoteError::io(&paths.export(), e)),
        }
    }

    /// Locate `reference` on the remote and check its pinned revision.
    fn locate(
        remote: &Remote,
        reference: &Reference,
    ) -> Result<(PackageCache, CachePaths, String), RemoteError> {
        let storage = Self::storage(remote);
        let paths = storage.layout_for(reference);
        if !paths.export().is_dir() {
            return Err(RemoteError::NotFound(format!(
                "recipe {} in remote '{}'",
                reference, remote.name
            )));
        }
        let revision = Self::recipe_revision(&storage, &paths)?;
        if let Some(pinned) = reference.revision() {
            if pinned != revision {
                return Err(RemoteError::NotFound(format!(
                    "recipe {} in remote '{}' (remote holds revision {})",
                    reference.full_text(),
                    remote.name,
                    revision
                )));
            }
        }
        Ok((storage, paths, revision))
    }
}

fn copy_into(src: &Path, dest: &Path) -> Result<Vec<String>, RemoteError> {
    merge_directories(src, dest).map_err(|e| RemoteError::io(dest, e))?;
    let mut files = Vec::new();
    for entry in WalkDir::new(dest).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| RemoteError::io(dest, e))?;
        if entry.file_type().is_dir() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(dest) {
            files.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }
    Ok(files)
}

#[async_trait]
impl RemoteManager for FileRemoteManager {
    async fn get_recipe(
        &self,
        reference: &Reference,
        remote: &Remote,
        export_dir: &Path,
    ) -> Result<RetrievedRecipe, RemoteError> {
        let (_, paths, revision) = Self::locate(remote, reference)?;
        let files = copy_into(&paths.export(), export_dir)?;
        debug!(reference = %reference, remote = %remote.name, %revision, "recipe retrieved");
        Ok(RetrievedRecipe {
            reference: reference.with_revision(revision),
            files,
        })
    }

    async fn get_recipe_sources(
        &self,
        reference: &Reference,
        remote: &Remote,
        dest: &Path,
    ) -> Result<(), RemoteError> {
        let (_, paths, _) = Self::locate(remote, reference)?;
        let sources = paths.export_sources();
        if !sources.is_dir() {
            return Err(RemoteError::NotFound(format!(
                "sources of {} in remote '{}'",
                reference, remote.name
            )));
        }
        copy_into(&sources, dest)?;
        debug!(reference = %reference, remote = %remote.name, "sources retrieved");
        Ok(())
    }

    async fn search_recipes(
        &self,
        query: &RecipeQuery,
        remote: &Remote,
    ) -> Result<Vec<Reference>, RemoteError> {
        let root = Self::root(remote);
        Self::storage(remote)
            .search_references(&query.name, query.user.as_deref(), query.channel.as_deref())
            .map_err(|e| RemoteError::io(&root, e))
    }

    async fn search_pattern(
        &self,
        pattern: &ReferencePattern,
        remote: &Remote,
    ) -> Result<Vec<Reference>, RemoteError> {
        let root = Self::root(remote);
        Self::storage(remote)
            .search_pattern(pattern)
            .map_err(|e| RemoteError::io(&root, e))
    }

    async fn search_packages(
        &self,
        reference: &Reference,
        remote: &Remote,
    ) -> Result<Vec<String>, RemoteError> {
        let (storage, paths, _) = Self::locate(remote, reference)?;
        storage
            .list_packages(reference)
            .map_err(|e| RemoteError::io(&paths.packages(), e))
    }

    async fn get_package(
        &self,
        package: &PackageReference,
        remote: &Remote,
        dest: &Path,
    ) -> Result<PackageReference, RemoteError> {
        let (storage, paths, _) = Self::locate(remote, package.reference())?;
        let folder = paths.package(package.package_id());
        if !folder.is_dir() {
            return Err(RemoteError::NotFound(format!(
                "package {} in remote '{}'",
                package, remote.name
            )));
        }

        let recorded = storage
            .metadata(package.reference())
            .load()
            .map_err(|e| RemoteError::io(&paths.metadata_file(), e))?
            .packages
            .get(package.package_id())
            .and_then(|p| p.revision.clone());
        let revision = match recorded {
            Some(revision) => revision,
            None => FileManifest::from_dir(&folder)
                .map(|m| m.revision())
                .map_err(|e| RemoteError::io(&folder, e))?,
        };

        copy_into(&folder, dest)?;
        debug!(package = %package, remote = %remote.name, %revision, "package retrieved");
        Ok(package.with_revision(revision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn seed(root: &Path) -> Reference {
        let reference = Reference::parse("say/0.1@myuser/testing").unwrap();
        let paths = PackageCache::new(root).layout_for(&reference);
        fs::create_dir_all(paths.export()).unwrap();
        fs::write(paths.recipe_file(), "[recipe]\n").unwrap();
        fs::create_dir_all(paths.export_sources().join("src")).unwrap();
        fs::write(paths.export_sources().join("src/say.c"), "int say;\n").unwrap();
        fs::create_dir_all(paths.package("pid1")).unwrap();
        fs::write(paths.package("pid1").join("lib.a"), "bin").unwrap();
        reference
    }

    fn remote(temp: &TempDir) -> Remote {
        Remote::new("local", temp.path().join("remote").display().to_string())
    }

    #[tokio::test]
    async fn retrieves_recipe_with_derived_revision() {
        let temp = TempDir::new().unwrap();
        let reference = seed(&temp.path().join("remote"));
        let dest = temp.path().join("dest");
        fs::create_dir_all(&dest).unwrap();

        let got = FileRemoteManager::new()
            .get_recipe(&reference, &remote(&temp), &dest)
            .await
            .unwrap();
        assert_eq!(got.files, vec!["recipe.toml".to_string()]);
        assert!(got.reference.revision().is_some());
        assert!(dest.join("recipe.toml").exists());
    }

    #[tokio::test]
    async fn pinned_revision_must_match() {
        let temp = TempDir::new().unwrap();
        let reference = seed(&temp.path().join("remote")).with_revision("deadbeef");
        let dest = temp.path().join("dest");
        fs::create_dir_all(&dest).unwrap();

        let err = FileRemoteManager::new()
            .get_recipe(&reference, &remote(&temp), &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::NotFound(_)));
    }

    #[tokio::test]
    async fn missing_recipe_is_not_found() {
        let temp = TempDir::new().unwrap();
        let reference = Reference::parse("nope/1.0@u/c").unwrap();
        let err = FileRemoteManager::new()
            .get_recipe(&reference, &remote(&temp), temp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::NotFound(_)));
    }

    #[tokio::test]
    async fn sources_search_and_packages() {
        let temp = TempDir::new().unwrap();
        let reference = seed(&temp.path().join("remote"));
        let manager = FileRemoteManager::new();
        let remote = Remote::new(
            "local",
            format!("file://{}", temp.path().join("remote").display()),
        );

        let sources = temp.path().join("sources");
        fs::create_dir_all(&sources).unwrap();
        manager
            .get_recipe_sources(&reference, &remote, &sources)
            .await
            .unwrap();
        assert!(sources.join("src/say.c").exists());

        let found = manager
            .search_recipes(&RecipeQuery::named("say"), &remote)
            .await
            .unwrap();
        assert_eq!(found, vec![reference.clone()]);
        let found = manager
            .search_pattern(&ReferencePattern::new("SAY/*").unwrap(), &remote)
            .await
            .unwrap();
        assert_eq!(found, vec![reference.clone()]);
        let found = manager
            .search_pattern(&ReferencePattern::new("hello*").unwrap(), &remote)
            .await
            .unwrap();
        assert!(found.is_empty());

        let ids = manager.search_packages(&reference, &remote).await.unwrap();
        assert_eq!(ids, vec!["pid1".to_string()]);

        let dest = temp.path().join("pkg");
        fs::create_dir_all(&dest).unwrap();
        let pref = PackageReference::new(reference, "pid1").unwrap();
        let got = manager.get_package(&pref, &remote, &dest).await.unwrap();
        assert!(got.revision().is_some());
        assert!(dest.join("lib.a").exists());
    }
}
