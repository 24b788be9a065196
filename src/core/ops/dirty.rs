//! core::ops::dirty
//!
//! Dirty-flag markers for managed cache folders.
//!
//! # Protocol
//!
//! - `<folder>.dirty` is written next to the folder before it is rewritten
//! - the marker is removed only after the rewrite completed
//! - a marker seen on a later access means the folder is corrupt
//!
//! [`DirtyGuard`] ties the marker to a scope. Dropping the guard without
//! calling [`DirtyGuard::commit`] leaves the marker in place, which covers
//! early returns, panics and cancelled futures alike.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

use super::CacheError;

/// Suffix appended to a folder name to form its marker file.
pub const DIRTY_SUFFIX: &str = ".dirty";

/// Path of the marker file for `folder`.
pub fn marker_path(folder: &Path) -> PathBuf {
    let mut name = folder
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(DIRTY_SUFFIX);
    folder.with_file_name(name)
}

/// Write the marker for `folder`, creating the parent directory if needed.
pub fn set_dirty(folder: &Path) -> io::Result<()> {
    let marker = marker_path(folder);
    if let Some(parent) = marker.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&marker, chrono::Utc::now().to_rfc3339())
}

/// Remove the marker for `folder`. Missing markers are fine.
pub fn clean_dirty(folder: &Path) -> io::Result<()> {
    match fs::remove_file(marker_path(folder)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Whether `folder` was left behind by an interrupted rewrite.
pub fn is_dirty(folder: &Path) -> bool {
    marker_path(folder).exists()
}

/// Wipe `folder` if it carries a dirty marker.
///
/// Returns `Ok(true)` when a corrupt folder was removed. A folder that cannot
/// be removed is reported as [`CacheError::CorruptCacheEntry`]; the marker
/// stays so the next access tries again.
pub fn recover_if_dirty(folder: &Path) -> Result<bool, CacheError> {
    if !is_dirty(folder) {
        return Ok(false);
    }

    warn!(folder = %folder.display(), "removing corrupted folder left by an interrupted operation");
    if folder.exists() {
        fs::remove_dir_all(folder).map_err(|e| CacheError::CorruptCacheEntry {
            path: folder.to_path_buf(),
            reason: format!("unable to remove folder: {}", e),
        })?;
    }
    clean_dirty(folder).map_err(|e| CacheError::CorruptCacheEntry {
        path: folder.to_path_buf(),
        reason: format!("unable to clear dirty marker: {}", e),
    })?;
    Ok(true)
}

/// Scope guard holding a dirty marker.
#[derive(Debug)]
#[must_use = "dropping the guard without commit() leaves the folder marked dirty"]
pub struct DirtyGuard {
    folder: PathBuf,
}

impl DirtyGuard {
    /// Write the marker for `folder` and return the guard.
    pub fn mark(folder: &Path) -> Result<Self, CacheError> {
        set_dirty(folder).map_err(|e| CacheError::io(marker_path(folder), e))?;
        Ok(Self {
            folder: folder.to_path_buf(),
        })
    }

    /// The guarded folder.
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Clear the marker: the rewrite finished.
    pub fn commit(self) -> Result<(), CacheError> {
        clean_dirty(&self.folder).map_err(|e| CacheError::io(marker_path(&self.folder), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn marker_sits_next_to_folder() {
        let marker = marker_path(Path::new("/cache/say/1.0/user/testing/source"));
        assert_eq!(
            marker,
            PathBuf::from("/cache/say/1.0/user/testing/source.dirty")
        );
    }

    #[test]
    fn set_and_clean() {
        let temp = TempDir::new().unwrap();
        let folder = temp.path().join("source");

        assert!(!is_dirty(&folder));
        set_dirty(&folder).unwrap();
        assert!(is_dirty(&folder));
        clean_dirty(&folder).unwrap();
        assert!(!is_dirty(&folder));

        // Cleaning twice is harmless
        clean_dirty(&folder).unwrap();
    }

    #[test]
    fn guard_dropped_without_commit_leaves_marker() {
        let temp = TempDir::new().unwrap();
        let folder = temp.path().join("source");

        {
            let _guard = DirtyGuard::mark(&folder).unwrap();
        }
        assert!(is_dirty(&folder));
    }

    #[test]
    fn guard_commit_clears_marker() {
        let temp = TempDir::new().unwrap();
        let folder = temp.path().join("source");

        let guard = DirtyGuard::mark(&folder).unwrap();
        assert_eq!(guard.folder(), folder.as_path());
        guard.commit().unwrap();
        assert!(!is_dirty(&folder));
    }

    #[test]
    fn recover_wipes_dirty_folder() {
        let temp = TempDir::new().unwrap();
        let folder = temp.path().join("source");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("half-written.c"), "int").unwrap();
        set_dirty(&folder).unwrap();

        assert!(recover_if_dirty(&folder).unwrap());
        assert!(!folder.exists());
        assert!(!is_dirty(&folder));
    }

    #[test]
    fn recover_leaves_clean_folder_alone() {
        let temp = TempDir::new().unwrap();
        let folder = temp.path().join("source");
        fs::create_dir_all(&folder).unwrap();

        assert!(!recover_if_dirty(&folder).unwrap());
        assert!(folder.exists());
    }
}
