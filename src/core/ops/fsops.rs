//! core::ops::fsops
//!
//! Recursive copies and atomic folder installs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::dirty::DirtyGuard;
use super::CacheError;

/// Remove `path` recursively if it exists.
pub fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Copy `src` into a new folder `dst`, preserving symbolic links.
///
/// `dst` must not exist yet.
pub fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    if dst.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("'{}' already exists", dst.display()),
        ));
    }
    fs::create_dir_all(dst)?;
    overlay(src, dst)
}

/// Copy every entry of `src` over `dst`, replacing files that already exist.
pub fn merge_directories(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    overlay(src, dst)
}

fn overlay(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in WalkDir::new(src).min_depth(1).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let target = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            replace_existing(&target)?;
            let link = fs::read_link(entry.path())?;
            make_symlink(&link, entry.path(), &target)?;
        } else {
            replace_existing(&target)?;
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn replace_existing(target: &Path) -> io::Result<()> {
    match fs::symlink_metadata(target) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(target),
        Ok(_) => fs::remove_file(target),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn make_symlink(link: &Path, _original: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(link, target)
}

#[cfg(windows)]
fn make_symlink(link: &Path, original: &Path, target: &Path) -> io::Result<()> {
    if original.is_dir() {
        std::os::windows::fs::symlink_dir(link, target)
    } else {
        std::os::windows::fs::symlink_file(link, target)
    }
}

/// Hidden sibling path used to stage a new version of `dest`.
pub fn staging_sibling(dest: &Path, purpose: &str) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".{}.{}-{}", name, purpose, uuid::Uuid::new_v4()))
}

/// Build a folder in a temporary sibling, then swap it into `dest`.
///
/// `build` receives the empty staging folder. On error the staging folder is
/// discarded and `dest` is untouched. The swap itself runs under a dirty
/// marker, so a crash between the two renames is detected on next access.
pub fn install_dir<T, E, F>(dest: &Path, build: F) -> Result<T, E>
where
    F: FnOnce(&Path) -> Result<T, E>,
    E: From<CacheError>,
{
    let staging = create_staging(dest)?;

    let value = match build(&staging) {
        Ok(value) => value,
        Err(e) => {
            discard_staging(&staging);
            return Err(e);
        }
    };

    install_staged(&staging, dest)?;
    Ok(value)
}

/// Create an empty staging sibling for `dest`.
///
/// Use with [`install_staged`] when the content is produced asynchronously.
pub fn create_staging(dest: &Path) -> Result<PathBuf, CacheError> {
    let staging = staging_sibling(dest, "tmp");
    fs::create_dir_all(&staging).map_err(|e| CacheError::io(&staging, e))?;
    Ok(staging)
}

/// Drop a staging folder that will not be installed.
pub fn discard_staging(staging: &Path) {
    if let Err(e) = remove_dir_if_exists(staging) {
        tracing::warn!(path = %staging.display(), error = %e, "failed to remove staging folder");
    }
}

/// Swap a fully built staging folder into `dest`.
///
/// The swap runs under a dirty marker, so a crash between the two renames is
/// detected on next access.
pub fn install_staged(staging: &Path, dest: &Path) -> Result<(), CacheError> {
    let guard = DirtyGuard::mark(dest)?;
    if dest.exists() {
        let retired = staging_sibling(dest, "old");
        fs::rename(dest, &retired).map_err(|e| CacheError::io(dest, e))?;
        fs::rename(staging, dest).map_err(|e| CacheError::io(dest, e))?;
        remove_dir_if_exists(&retired).map_err(|e| CacheError::io(&retired, e))?;
    } else {
        fs::rename(staging, dest).map_err(|e| CacheError::io(dest, e))?;
    }
    guard.commit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ops::dirty::is_dirty;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn copy_tree_copies_nested_files() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        write(&src, "a.txt", "a");
        write(&src, "nested/b.txt", "b");

        let dst = temp.path().join("dst");
        copy_tree(&src, &dst).unwrap();
        assert_eq!(fs::read_to_string(dst.join("a.txt")).unwrap(), "a");
        assert_eq!(fs::read_to_string(dst.join("nested/b.txt")).unwrap(), "b");
    }

    #[test]
    fn copy_tree_refuses_existing_destination() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        write(&src, "a.txt", "a");
        let dst = temp.path().join("dst");
        fs::create_dir_all(&dst).unwrap();

        assert!(copy_tree(&src, &dst).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn copy_tree_preserves_symlinks() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        write(&src, "lib/libsay.so.1", "elf");
        std::os::unix::fs::symlink("libsay.so.1", src.join("lib/libsay.so")).unwrap();

        let dst = temp.path().join("dst");
        copy_tree(&src, &dst).unwrap();

        let link = dst.join("lib/libsay.so");
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("libsay.so.1"));
    }

    #[test]
    fn merge_overwrites_existing_files() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        write(&src, "a.txt", "new");
        write(&dst, "a.txt", "old");
        write(&dst, "keep.txt", "keep");

        merge_directories(&src, &dst).unwrap();
        assert_eq!(fs::read_to_string(dst.join("a.txt")).unwrap(), "new");
        assert_eq!(fs::read_to_string(dst.join("keep.txt")).unwrap(), "keep");
    }

    #[test]
    fn install_replaces_destination() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("export");
        write(&dest, "old.txt", "old");

        install_dir(&dest, |staging| -> Result<(), CacheError> {
            fs::write(staging.join("new.txt"), "new").map_err(|e| CacheError::io(staging, e))
        })
        .unwrap();

        assert!(dest.join("new.txt").exists());
        assert!(!dest.join("old.txt").exists());
        assert!(!is_dirty(&dest));
        // Only the destination remains in the parent
        let entries: Vec<_> = fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn failed_build_leaves_destination_untouched() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("export");
        write(&dest, "old.txt", "old");

        let result = install_dir(&dest, |_staging| -> Result<(), CacheError> {
            Err(CacheError::io("x", io::Error::new(io::ErrorKind::Other, "boom")))
        });

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(dest.join("old.txt")).unwrap(), "old");
        assert!(!is_dirty(&dest));
        let entries: Vec<_> = fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
