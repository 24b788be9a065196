//! engine
//!
//! Orchestrates resolution and cache maintenance on top of the core types.
//!
//! # Architecture
//!
//! Every operation receives a [`Session`]: borrowed handles to the package
//! cache, the remotes registry, the remote transport and the recipe loader.
//! Nothing is global; two sessions over different caches never interact.
//!
//! - [`builder`] - Dependency graph construction with override/conflict rules
//! - [`proxy`] - Recipe lookup, local first, then remotes
//! - [`decision`] - Audit log entries recorded by the builder
//! - [`sources`] - Lazy completion of bundled sources, working source folder
//! - [`export`] - Export of a recipe folder into the cache
//! - [`package`] - Registration of built binaries
//! - [`copy`] - Promotion to another user/channel
//! - [`download`] - Eager retrieval from one remote
//!
//! # Example
//!
//! ```ignore
//! use stowage::engine::{resolve, Session};
//! use stowage::range::UpdatePolicy;
//!
//! let session = Session::new(&cache, &remotes, &manager, &loader);
//! let resolution = resolve(session, &requirements, UpdatePolicy::local()).await?;
//! for level in resolution.graph.by_levels() {
//!     // leaves first
//! }
//! ```

pub mod builder;
pub mod copy;
pub mod decision;
pub mod download;
pub mod export;
pub mod package;
pub mod proxy;
pub mod sources;

use std::path::PathBuf;

use crate::core::cache::PackageCache;
use crate::range::UpdatePolicy;
use crate::recipe::{RecipeLoader, Requirement};
use crate::remote::{RemoteManager, Remotes};

pub use builder::{GraphBuilder, GraphError, Resolution};
pub use copy::{copy_package, Confirm, CopyError, CopyReport, PackageSelection};
pub use decision::Decision;
pub use download::{download, DownloadError, DownloadReport};
pub use export::{export_recipe, ExportError, ExportOutcome};
pub use package::{register_package, PackageError};
pub use proxy::{LookupError, RecipeCache, RecipeLookup};
pub use sources::{complete_sources, config_source, SourceConfig, SourceError, SourcesOutcome};

/// Execution context for commands.
///
/// Contains global settings derived from CLI flags that affect command behavior.
#[derive(Debug, Clone)]
pub struct Context {
    /// Home folder override (`--home`).
    pub home: Option<PathBuf>,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
    /// Interactive mode enabled.
    pub interactive: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            home: None,
            debug: false,
            quiet: false,
            interactive: true,
        }
    }
}

/// Collaborators shared by one operation.
#[derive(Clone, Copy)]
pub struct Session<'a> {
    pub cache: &'a PackageCache,
    pub remotes: &'a Remotes,
    pub manager: &'a dyn RemoteManager,
    pub loader: &'a dyn RecipeLoader,
}

impl<'a> Session<'a> {
    pub fn new(
        cache: &'a PackageCache,
        remotes: &'a Remotes,
        manager: &'a dyn RemoteManager,
        loader: &'a dyn RecipeLoader,
    ) -> Self {
        Self {
            cache,
            remotes,
            manager,
            loader,
        }
    }
}

impl std::fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("storage", &self.cache.storage())
            .field("remotes", &self.remotes.len())
            .finish()
    }
}

/// Build the dependency graph of `requirements`.
///
/// Convenience over [`GraphBuilder`] when the decision log of a failed
/// build is not needed.
pub async fn resolve(
    session: Session<'_>,
    requirements: &[Requirement],
    policy: UpdatePolicy,
) -> Result<Resolution, GraphError> {
    GraphBuilder::new(session, policy).build(requirements).await
}
