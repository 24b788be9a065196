//! core::cache
//!
//! The local package cache: storage root, short-path policy and lookups
//! across entries.
//!
//! # Architecture
//!
//! [`PackageCache`] owns no state beyond its configuration. Every query
//! reads the filesystem, so several processes may share one storage root.
//! Per-entry paths come from [`CachePaths`], per-entry bookkeeping from
//! [`MetadataStore`].
//!
//! # Example
//!
//! ```
//! use stowage::core::cache::PackageCache;
//! use stowage::core::reference::Reference;
//! use std::path::Path;
//!
//! let cache = PackageCache::new("/data");
//! let reference = Reference::parse("say/1.1@myuser/testing").unwrap();
//! let paths = cache.layout_for(&reference);
//! assert_eq!(paths.base(), Path::new("/data/say/1.1/myuser/testing"));
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::config::Config;
use crate::core::metadata::MetadataStore;
use crate::core::ops::CacheError;
use crate::core::paths::CachePaths;
use crate::core::pattern::ReferencePattern;
use crate::core::reference::Reference;

/// Handle on a cache storage root.
#[derive(Debug, Clone)]
pub struct PackageCache {
    storage: PathBuf,
    short_paths_root: Option<PathBuf>,
}

impl PackageCache {
    /// Cache rooted at `storage` with short paths disabled.
    pub fn new(storage: impl Into<PathBuf>) -> Self {
        Self {
            storage: storage.into(),
            short_paths_root: None,
        }
    }

    /// Cache described by the configuration.
    pub fn from_config(config: &Config) -> Self {
        let cache = Self::new(config.storage_path());
        if config.short_paths_enabled() {
            cache.with_short_paths(config.short_paths_root())
        } else {
            cache
        }
    }

    /// Enable short-path redirection below `root`.
    pub fn with_short_paths(mut self, root: impl Into<PathBuf>) -> Self {
        self.short_paths_root = Some(root.into());
        self
    }

    /// The storage root.
    pub fn storage(&self) -> &Path {
        &self.storage
    }

    /// Layout of one entry, never redirected.
    pub fn layout_for(&self, reference: &Reference) -> CachePaths {
        CachePaths::new(&self.storage, reference)
    }

    /// Layout of one entry, redirected when the recipe asks for short paths
    /// and the cache has them enabled.
    pub fn layout_for_recipe(&self, reference: &Reference, short_paths: bool) -> CachePaths {
        let paths = self.layout_for(reference);
        match (&self.short_paths_root, short_paths) {
            (Some(root), true) => paths.with_short_paths(root.clone()),
            _ => paths,
        }
    }

    /// Metadata store of one entry.
    pub fn metadata(&self, reference: &Reference) -> MetadataStore {
        MetadataStore::new(self.layout_for(reference).metadata_file())
    }

    /// Exported references named `name`, optionally restricted to one
    /// user/channel, sorted.
    ///
    /// Hidden folders (staging siblings) are never reported.
    pub fn search_references(
        &self,
        name: &str,
        user: Option<&str>,
        channel: Option<&str>,
    ) -> Result<Vec<Reference>, CacheError> {
        let mut found = Vec::new();
        let name_dir = self.storage.join(name);

        for version in visible_dirs(&name_dir)? {
            let version_dir = name_dir.join(&version);
            for found_user in visible_dirs(&version_dir)? {
                if user.is_some_and(|u| u != found_user) {
                    continue;
                }
                for found_channel in visible_dirs(&version_dir.join(&found_user))? {
                    if channel.is_some_and(|c| c != found_channel) {
                        continue;
                    }
                    // Folders that do not form a valid reference are not ours.
                    let Ok(reference) = Reference::new(name, &version, &found_user, &found_channel)
                    else {
                        continue;
                    };
                    if self.layout_for(&reference).has_recipe() {
                        found.push(reference);
                    }
                }
            }
        }

        found.sort();
        debug!(name, count = found.len(), "local references searched");
        Ok(found)
    }

    /// Every exported reference matching `pattern`, sorted.
    pub fn search_pattern(&self, pattern: &ReferencePattern) -> Result<Vec<Reference>, CacheError> {
        let mut found = Vec::new();
        for name in visible_dirs(&self.storage)? {
            for reference in self.search_references(&name, None, None)? {
                if pattern.matches(&reference) {
                    found.push(reference);
                }
            }
        }
        found.sort();
        debug!(pattern = pattern.as_str(), count = found.len(), "local references matched");
        Ok(found)
    }

    /// Package ids installed for `reference`, sorted.
    pub fn list_packages(&self, reference: &Reference) -> Result<Vec<String>, CacheError> {
        let mut ids = visible_dirs(&self.layout_for(reference).packages())?;
        ids.sort();
        Ok(ids)
    }
}

/// Names of the non-hidden directories in `dir`. A missing `dir` is empty.
fn visible_dirs(dir: &Path) -> Result<Vec<String>, CacheError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(CacheError::io(dir, e)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CacheError::io(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        if entry.path().is_dir() {
            names.push(name);
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::paths::RECIPE_FILE;
    use tempfile::TempDir;

    fn export(cache: &PackageCache, text: &str) -> Reference {
        let reference = Reference::parse(text).unwrap();
        let paths = cache.layout_for(&reference);
        fs::create_dir_all(paths.export()).unwrap();
        fs::write(paths.export().join(RECIPE_FILE), "[recipe]\n").unwrap();
        reference
    }

    #[test]
    fn search_finds_exported_versions() {
        let temp = TempDir::new().unwrap();
        let cache = PackageCache::new(temp.path());
        export(&cache, "say/0.1@myuser/testing");
        export(&cache, "say/0.2@myuser/testing");
        export(&cache, "say/0.2@other/stable");
        export(&cache, "hello/1.0@myuser/testing");

        let found = cache
            .search_references("say", Some("myuser"), Some("testing"))
            .unwrap();
        let versions: Vec<_> = found.iter().map(|r| r.version()).collect();
        assert_eq!(versions, vec!["0.1", "0.2"]);

        assert_eq!(cache.search_references("say", None, None).unwrap().len(), 3);
    }

    #[test]
    fn pattern_search_spans_names() {
        let temp = TempDir::new().unwrap();
        let cache = PackageCache::new(temp.path());
        export(&cache, "Hello/1.4.10@myuser/testing");
        export(&cache, "helloTest/1.4.10@myuser/stable");
        export(&cache, "Bye/0.14@myuser/testing");
        fs::create_dir_all(temp.path().join(".staging/1.0/u/c/export")).unwrap();

        let texts = |pattern: ReferencePattern| -> Vec<String> {
            cache
                .search_pattern(&pattern)
                .unwrap()
                .iter()
                .map(|r| r.to_string())
                .collect()
        };
        assert_eq!(
            texts(ReferencePattern::new("hello*").unwrap()),
            vec!["Hello/1.4.10@myuser/testing", "helloTest/1.4.10@myuser/stable"]
        );
        assert_eq!(
            texts(ReferencePattern::new("*/*@*/testing").unwrap()),
            vec!["Bye/0.14@myuser/testing", "Hello/1.4.10@myuser/testing"]
        );
        assert_eq!(texts(ReferencePattern::any()).len(), 3);
        assert!(texts(ReferencePattern::case_sensitive("bye*").unwrap()).is_empty());
    }

    #[test]
    fn search_ignores_entries_without_recipe() {
        let temp = TempDir::new().unwrap();
        let cache = PackageCache::new(temp.path());
        export(&cache, "say/0.1@myuser/testing");
        fs::create_dir_all(temp.path().join("say/0.9/myuser/testing/package")).unwrap();
        fs::create_dir_all(temp.path().join("say/.0.3.tmp-x/myuser/testing/export")).unwrap();

        let found = cache.search_references("say", None, None).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn search_unknown_name_is_empty() {
        let temp = TempDir::new().unwrap();
        let cache = PackageCache::new(temp.path());
        assert!(cache.search_references("nope", None, None).unwrap().is_empty());
    }

    #[test]
    fn list_packages_skips_hidden() {
        let temp = TempDir::new().unwrap();
        let cache = PackageCache::new(temp.path());
        let reference = export(&cache, "say/0.1@myuser/testing");
        let packages = cache.layout_for(&reference).packages();
        fs::create_dir_all(packages.join("bbb")).unwrap();
        fs::create_dir_all(packages.join("aaa")).unwrap();
        fs::create_dir_all(packages.join(".aaa.tmp-1")).unwrap();

        assert_eq!(cache.list_packages(&reference).unwrap(), vec!["aaa", "bbb"]);
    }

    #[test]
    fn short_paths_need_recipe_and_config() {
        let reference = Reference::parse("say/0.1@myuser/testing").unwrap();
        let plain = PackageCache::new("/data");
        assert!(!plain.layout_for_recipe(&reference, true).uses_short_paths());

        let short = PackageCache::new("/data").with_short_paths("/s");
        assert!(short.layout_for_recipe(&reference, true).uses_short_paths());
        assert!(!short.layout_for_recipe(&reference, false).uses_short_paths());
        assert!(!short.layout_for(&reference).uses_short_paths());
    }
}
