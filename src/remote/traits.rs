//! remote::traits
//!
//! RemoteManager trait definition for retrieving recipes and binaries.
//!
//! # Design
//!
//! The trait is async because remote operations involve I/O. Every call is
//! an atomic fail/succeed unit: either the destination folder was fully
//! populated or an error is returned. Retry and backoff belong to the
//! implementation, never to callers.
//!
//! Destinations handed to the manager are empty staging folders; callers
//! rename them into the cache once the call succeeded.
//!
//! # Example
//!
//! ```ignore
//! use stowage::remote::{RemoteManager, RecipeQuery};
//!
//! async fn versions(manager: &dyn RemoteManager, remote: &Remote) -> Result<(), RemoteError> {
//!     let found = manager.search_recipes(&RecipeQuery::named("say"), remote).await?;
//!     for reference in found {
//!         println!("{}", reference);
//!     }
//!     Ok(())
//! }
//! ```

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use super::registry::Remote;
use crate::core::pattern::ReferencePattern;
use crate::core::reference::{PackageReference, Reference};

/// Errors from remote operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The requested recipe, sources or binary does not exist on the remote.
    #[error("not found: {0}")]
    NotFound(String),

    /// Transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// Local filesystem failure while storing the result.
    #[error("i/o error at '{path}': {message}")]
    Io { path: String, message: String },

    /// The remote name is not registered.
    #[error("unknown remote '{0}'")]
    UnknownRemote(String),
}

impl RemoteError {
    pub(crate) fn io(path: &Path, err: impl std::fmt::Display) -> Self {
        RemoteError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

/// A recipe stored into an export folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedRecipe {
    /// The reference, pinned to the revision that was retrieved
    pub reference: Reference,
    /// Relative paths of the files written
    pub files: Vec<String>,
}

/// Search filter for recipes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecipeQuery {
    pub name: String,
    pub user: Option<String>,
    pub channel: Option<String>,
}

impl RecipeQuery {
    /// Every user/channel of `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            user: None,
            channel: None,
        }
    }

    /// `name` restricted to one user/channel.
    pub fn with_user_channel(
        name: impl Into<String>,
        user: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            user: Some(user.into()),
            channel: Some(channel.into()),
        }
    }

    /// Whether `reference` passes the filter.
    pub fn matches(&self, reference: &Reference) -> bool {
        reference.name() == self.name
            && self.user.as_deref().map_or(true, |u| u == reference.user())
            && self.channel.as_deref().map_or(true, |c| c == reference.channel())
    }
}

/// Access to recipes and binaries held by remotes.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`.
///
/// # Error Handling
///
/// - `NotFound`: the remote does not hold the item; callers may try the
///   next remote
/// - anything else: the call failed and the caller should stop
#[async_trait]
pub trait RemoteManager: Send + Sync {
    /// Write the recipe files of `reference` into `export_dir`.
    ///
    /// When `reference` carries a revision, only that revision is accepted.
    async fn get_recipe(
        &self,
        reference: &Reference,
        remote: &Remote,
        export_dir: &Path,
    ) -> Result<RetrievedRecipe, RemoteError>;

    /// Write the bundled sources of `reference` into `dest`.
    async fn get_recipe_sources(
        &self,
        reference: &Reference,
        remote: &Remote,
        dest: &Path,
    ) -> Result<(), RemoteError>;

    /// References held by the remote that pass `query`.
    async fn search_recipes(
        &self,
        query: &RecipeQuery,
        remote: &Remote,
    ) -> Result<Vec<Reference>, RemoteError>;

    /// References held by the remote whose text matches `pattern`.
    async fn search_pattern(
        &self,
        pattern: &ReferencePattern,
        remote: &Remote,
    ) -> Result<Vec<Reference>, RemoteError>;

    /// Package ids of the binaries held for `reference`.
    async fn search_packages(
        &self,
        reference: &Reference,
        remote: &Remote,
    ) -> Result<Vec<String>, RemoteError>;

    /// Write one binary into `dest`, returning it pinned to its revision.
    async fn get_package(
        &self,
        package: &PackageReference,
        remote: &Remote,
        dest: &Path,
    ) -> Result<PackageReference, RemoteError>;
}
