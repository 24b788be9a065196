//! recipe::traits
//!
//! Capability view of a recipe.
//!
//! # Design
//!
//! The resolver never cares how a recipe computes its answers. It only asks
//! for its requirements and a handful of flags, so any recipe format can be
//! plugged in behind [`RecipeLoader`].
//!
//! # Thread Safety
//!
//! Recipes and loaders must be `Send + Sync`; a loaded recipe is shared
//! behind an `Arc` by every graph node that uses it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use super::requirement::{Requirement, RequirementError};

/// Errors from loading a recipe.
#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("failed to read recipe '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse recipe '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid requirement in recipe '{}': {source}", path.display())]
    Requirement {
        path: PathBuf,
        source: RequirementError,
    },
}

/// Local working-copy capture requested by a recipe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScmCapture {
    /// Capture the origin URL of the working copy.
    pub capture_origin: bool,
    /// Capture the current revision of the working copy.
    pub capture_revision: bool,
}

impl ScmCapture {
    /// Whether the exporting folder should be recorded as the source.
    ///
    /// Either flag is enough.
    pub fn captures_local_folder(&self) -> bool {
        self.capture_origin || self.capture_revision
    }
}

/// What the graph builder and the cache need from a recipe.
pub trait Recipe: Send + Sync + std::fmt::Debug {
    /// Declared dependencies, in declaration order.
    fn requirements(&self) -> Vec<Requirement>;

    /// Whether source files are bundled with the recipe.
    fn declares_bundled_sources(&self) -> bool {
        !self.exports_sources().is_empty()
    }

    /// Whether deep cache folders should be redirected to short paths.
    fn uses_short_paths(&self) -> bool {
        false
    }

    /// Local working-copy capture flags.
    fn scm(&self) -> ScmCapture {
        ScmCapture::default()
    }

    /// Glob patterns of extra files exported next to the recipe.
    fn exports(&self) -> Vec<String> {
        Vec::new()
    }

    /// Glob patterns of bundled source files.
    fn exports_sources(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Loads a recipe file into its capability view.
pub trait RecipeLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Arc<dyn Recipe>, RecipeError>;
}
