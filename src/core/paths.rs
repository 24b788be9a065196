//! core::paths
//!
//! Centralized path routing for one cache entry.
//!
//! # Storage Layout
//!
//! Every reference owns `<storage>/<name>/<version>/<user>/<channel>/`:
//! - `export/` - Recipe files proper (`export/recipe.toml` is the recipe)
//! - `export_source/` - Bundled source files, fetched lazily
//! - `source/` - Working source folder materialised for builds
//! - `build/<package_id>/` - Build folders
//! - `package/<package_id>/` - Installed binaries
//! - `metadata.json` - Revision bookkeeping
//! - `scm_folder.txt` - Pointer to a captured local working copy
//!
//! **Hard rule:** no code outside this module joins cache sub-paths by hand.
//!
//! # Short Paths
//!
//! When short paths are active, `source/`, `build/<id>/` and
//! `package/<id>/` are redirected to `<short_root>/<hash>/`, where the hash
//! is derived from the cache-side path. The redirect is deterministic, so
//! lookups never need to read a link file; [`CachePaths::prepare_dir`] still
//! drops a `.stow_link` file in the cache-side folder pointing at the real
//! location.
//!
//! # Example
//!
//! ```
//! use stowage::core::paths::CachePaths;
//! use stowage::core::reference::Reference;
//! use std::path::{Path, PathBuf};
//!
//! let reference = Reference::parse("say/1.1@myuser/testing").unwrap();
//! let paths = CachePaths::new(Path::new("/cache"), &reference);
//!
//! assert_eq!(paths.base(), Path::new("/cache/say/1.1/myuser/testing"));
//! assert_eq!(
//!     paths.recipe_file(),
//!     PathBuf::from("/cache/say/1.1/myuser/testing/export/recipe.toml")
//! );
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::core::reference::Reference;

/// File name of recipes inside the export folder.
pub const RECIPE_FILE: &str = "recipe.toml";

/// Link file left in cache-side folders that were redirected.
pub const LINK_FILE: &str = ".stow_link";

/// Canonical paths of one cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePaths {
    reference: Reference,
    base: PathBuf,
    short_root: Option<PathBuf>,
}

impl CachePaths {
    /// Paths for `reference` under `storage`, without short-path redirection.
    pub fn new(storage: &Path, reference: &Reference) -> Self {
        let base = storage
            .join(reference.name())
            .join(reference.version())
            .join(reference.user())
            .join(reference.channel());
        Self {
            reference: reference.clone(),
            base,
            short_root: None,
        }
    }

    /// Redirect deep folders below `short_root`.
    pub fn with_short_paths(mut self, short_root: PathBuf) -> Self {
        self.short_root = Some(short_root);
        self
    }

    /// The reference these paths belong to.
    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    /// Whether deep folders are redirected.
    pub fn uses_short_paths(&self) -> bool {
        self.short_root.is_some()
    }

    // =========================================================================
    // Recipe-level paths
    // =========================================================================

    /// Base directory of the entry.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// The recipe file: `export/recipe.toml`.
    pub fn recipe_file(&self) -> PathBuf {
        self.export().join(RECIPE_FILE)
    }

    /// Recipe files proper: `export/`.
    pub fn export(&self) -> PathBuf {
        self.base.join("export")
    }

    /// Bundled source files: `export_source/`.
    pub fn export_sources(&self) -> PathBuf {
        self.base.join("export_source")
    }

    /// Metadata file: `metadata.json`.
    pub fn metadata_file(&self) -> PathBuf {
        self.base.join("metadata.json")
    }

    /// Pointer to a captured local working copy: `scm_folder.txt`.
    pub fn scm_pointer(&self) -> PathBuf {
        self.base.join("scm_folder.txt")
    }

    // =========================================================================
    // Deep paths (short-path eligible)
    // =========================================================================

    /// Working source folder: `source/`.
    pub fn source(&self) -> PathBuf {
        self.redirect(self.base.join("source"))
    }

    /// Build folder of one binary: `build/<package_id>/`.
    pub fn build(&self, package_id: &str) -> PathBuf {
        self.redirect(self.base.join("build").join(package_id))
    }

    /// Parent of all installed binaries: `package/`.
    pub fn packages(&self) -> PathBuf {
        self.base.join("package")
    }

    /// Installed binary of one package id: `package/<package_id>/`.
    pub fn package(&self, package_id: &str) -> PathBuf {
        self.redirect(self.packages().join(package_id))
    }

    fn redirect(&self, cache_side: PathBuf) -> PathBuf {
        match &self.short_root {
            Some(root) => {
                let digest = Sha256::digest(cache_side.to_string_lossy().as_bytes());
                root.join(&hex::encode(digest)[..16])
            }
            None => cache_side,
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Prepare a deep folder for installation and return its real path.
    ///
    /// `cache_side` is the unredirected path (`<base>/source`,
    /// `<base>/package/<id>`, ...). The parent of the real path is created;
    /// the real folder itself is left for the caller to install. Redirected
    /// folders get a link file in their cache-side folder.
    pub fn prepare_dir(&self, cache_side: &Path) -> io::Result<PathBuf> {
        let real = self.redirect(cache_side.to_path_buf());
        if let Some(parent) = real.parent() {
            fs::create_dir_all(parent)?;
        }
        if real != cache_side {
            fs::create_dir_all(cache_side)?;
            fs::write(cache_side.join(LINK_FILE), real.to_string_lossy().as_bytes())?;
        }
        Ok(real)
    }

    /// Unredirected path of the working source folder.
    pub fn source_cache_side(&self) -> PathBuf {
        self.base.join("source")
    }

    /// Unredirected path of a package folder.
    pub fn package_cache_side(&self, package_id: &str) -> PathBuf {
        self.packages().join(package_id)
    }

    /// Whether the recipe has been exported into this entry.
    pub fn has_recipe(&self) -> bool {
        self.recipe_file().exists()
    }
}
