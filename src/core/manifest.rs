//! core::manifest
//!
//! File manifests and content-derived revisions.
//!
//! A manifest maps every file below a folder (relative path, forward
//! slashes) to the sha256 of its content. The revision of an export or a
//! package folder is the hash of its sorted manifest, so identical content
//! always yields the identical revision regardless of when or where it was
//! produced.
//!
//! # Example
//!
//! ```
//! use stowage::core::manifest::FileManifest;
//!
//! let mut a = FileManifest::default();
//! a.insert("recipe.toml", b"[recipe]\n");
//! a.insert("src/lib.c", b"int x;\n");
//!
//! let mut b = FileManifest::default();
//! b.insert("src/lib.c", b"int x;\n");
//! b.insert("recipe.toml", b"[recipe]\n");
//!
//! assert_eq!(a.revision(), b.revision());
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;


/// Name of the manifest file written into export folders.
pub const MANIFEST_FILE: &str = "manifest.txt";

/// Relative path → content checksum.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileManifest {
    files: BTreeMap<String, String>,
}

impl FileManifest {
    /// Build the manifest of every regular file (and symlink) below `dir`.
    ///
    /// The manifest file itself is skipped. Symlinks
    /// contribute their target path rather than the linked content.
    pub fn from_dir(dir: &Path) -> io::Result<Self> {
        let mut manifest = Self::default();
        for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(dir)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if key == MANIFEST_FILE {
                continue;
            }

            if file_type.is_symlink() {
                let target = fs::read_link(entry.path())?;
                manifest.insert(&key, target.to_string_lossy().as_bytes());
            } else {
                manifest.insert(&key, &fs::read(entry.path())?);
            }
        }
        Ok(manifest)
    }

    /// Record `content` under `path`.
    pub fn insert(&mut self, path: impl Into<String>, content: &[u8]) {
        self.files.insert(path.into(), hex::encode(Sha256::digest(content)));
    }

    /// Add every entry of `other` under `prefix/`.
    pub fn extend_prefixed(&mut self, prefix: &str, other: &FileManifest) {
        for (path, checksum) in &other.files {
            self.files
                .insert(format!("{}/{}", prefix, path), checksum.clone());
        }
    }

    /// Checksum recorded for `path`.
    pub fn checksum(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Content revision: sha256 over the sorted `path: checksum` lines.
    pub fn revision(&self) -> String {
        let mut hasher = Sha256::new();
        for (path, checksum) in &self.files {
            hasher.update(path.as_bytes());
            hasher.update(b": ");
            hasher.update(checksum.as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }

    /// Text form written to [`MANIFEST_FILE`].
    pub fn to_text(&self) -> String {
        self.files
            .iter()
            .map(|(path, checksum)| format!("{}: {}\n", path, checksum))
            .collect()
    }

    /// Write the manifest into `dir/manifest.txt`.
    ///
    /// The first line is the unix time of the write; it takes no part in
    /// the revision.
    pub fn save(&self, dir: &Path) -> io::Result<()> {
        let text = format!("{}\n{}", Utc::now().timestamp(), self.to_text());
        fs::write(dir.join(MANIFEST_FILE), text)
    }

    /// Time recorded by [`FileManifest::save`] in `dir`, if any.
    pub fn saved_at(dir: &Path) -> io::Result<Option<DateTime<Utc>>> {
        let text = match fs::read_to_string(dir.join(MANIFEST_FILE)) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(text
            .lines()
            .next()
            .and_then(|line| line.trim().parse::<i64>().ok())
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single()))
    }
}
