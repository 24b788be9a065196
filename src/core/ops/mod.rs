//! core::ops
//!
//! Crash-safe filesystem operations on managed cache folders.
//!
//! # Modules
//!
//! - [`dirty`] - Dirty-flag markers for interrupted destructive rewrites
//! - [`fsops`] - Symlink-preserving copies and build-then-rename installs
//!
//! # Architecture
//!
//! Every destructive rewrite of a managed folder:
//! 1. Builds the new content in a hidden temporary sibling
//! 2. Writes the dirty marker next to the destination
//! 3. Swaps the sibling into place with renames
//! 4. Clears the marker only after the swap succeeded
//!
//! A marker found on a later access means the rewrite never finished. The
//! folder is wiped and rebuilt; only a failure to wipe is fatal.
//!
//! # Example
//!
//! ```no_run
//! use stowage::core::ops::{install_dir, CacheError};
//! use std::path::Path;
//!
//! let dest = Path::new("/cache/say/1.0/user/testing/export");
//! install_dir(dest, |tmp| -> Result<(), CacheError> {
//!     std::fs::write(tmp.join("recipe.toml"), "[recipe]\n").map_err(|e| CacheError::Io {
//!         path: tmp.to_path_buf(),
//!         source: e,
//!     })
//! })
//! .unwrap();
//! ```

pub mod dirty;
pub mod fsops;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use dirty::{clean_dirty, is_dirty, recover_if_dirty, set_dirty, DirtyGuard, DIRTY_SUFFIX};
pub use fsops::{
    copy_tree, create_staging, discard_staging, install_dir, install_staged, merge_directories,
    remove_dir_if_exists,
};

/// Errors from cache folder operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A dirty folder could not be wiped; manual intervention is required.
    #[error("corrupt cache entry at '{}': {reason}; please delete it manually", path.display())]
    CorruptCacheEntry {
        /// The folder left behind by an interrupted operation.
        path: PathBuf,
        /// What went wrong while rebuilding it.
        reason: String,
    },

    /// Filesystem error on a managed path.
    #[error("cache i/o error at '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }
}
