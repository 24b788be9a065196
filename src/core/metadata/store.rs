//! core::metadata::store
//!
//! Scoped, all-or-nothing updates of a cache entry's metadata file.
//!
//! # Contract
//!
//! [`MetadataStore::update`] hands the closure an in-memory copy of the
//! metadata. When the closure returns `Ok`, the copy is written back with a
//! temp-file + fsync + rename sequence. When it returns `Err` or panics,
//! nothing is written and the file keeps its previous bytes.
//!
//! Concurrent writers from other processes resolve as whole-file
//! last-writer-wins; fields are never merged.
//!
//! # Example
//!
//! ```no_run
//! use stowage::core::metadata::store::{MetadataStore, StoreError};
//! use std::path::Path;
//!
//! let store = MetadataStore::new(Path::new("/cache/say/1.1/user/testing/metadata.json"));
//! store
//!     .update(|meta| -> Result<(), StoreError> {
//!         meta.recipe.remote = Some("local".into());
//!         Ok(())
//!     })
//!     .unwrap();
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::schema::{MetadataError, PackageCacheMetadata};

/// Errors from metadata storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The metadata file could not be read.
    #[error("failed to read metadata '{}': {source}", path.display())]
    ReadError { path: PathBuf, source: io::Error },

    /// The metadata file could not be written.
    #[error("failed to write metadata '{}': {source}", path.display())]
    WriteError { path: PathBuf, source: io::Error },

    /// The metadata content is invalid.
    #[error("metadata error in '{}': {source}", path.display())]
    Invalid {
        path: PathBuf,
        source: MetadataError,
    },
}

/// Metadata file of one cache entry.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    /// Store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the metadata. A missing file reads as an empty record.
    pub fn load(&self) -> Result<PackageCacheMetadata, StoreError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(PackageCacheMetadata::default())
            }
            Err(e) => {
                return Err(StoreError::ReadError {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        PackageCacheMetadata::from_json(&json).map_err(|e| StoreError::Invalid {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Apply `mutate` to a copy of the metadata and persist it on success.
    ///
    /// The error type of the closure only needs to absorb [`StoreError`], so
    /// callers can bubble their own errors out of the scope.
    pub fn update<T, E, F>(&self, mutate: F) -> Result<T, E>
    where
        F: FnOnce(&mut PackageCacheMetadata) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut metadata = self.load()?;
        let value = mutate(&mut metadata)?;
        self.write(&metadata)?;
        Ok(value)
    }

    /// Replace the whole file atomically.
    pub fn write(&self, metadata: &PackageCacheMetadata) -> Result<(), StoreError> {
        let json = metadata.to_json().map_err(|e| StoreError::Invalid {
            path: self.path.clone(),
            source: e,
        })?;

        let write_err = |path: &Path, source: io::Error| StoreError::WriteError {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_err(parent, e))?;
        }

        let temp_path = self
            .path
            .with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4()));
        let result = (|| -> io::Result<()> {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
            fs::rename(&temp_path, &self.path)
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path);
            return Err(write_err(&self.path, e));
        }

        debug!(path = %self.path.display(), "metadata written");
        Ok(())
    }
}
