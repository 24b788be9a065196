//! Shared setup for command handlers.

use anyhow::{Context as _, Result};

use crate::core::cache::PackageCache;
use crate::core::config::Config;
use crate::core::reference::Reference;
use crate::engine::{Context, Session};
use crate::recipe::TomlRecipeLoader;
use crate::remote::{FileRemoteManager, Remotes};
use crate::ui::output::Verbosity;

/// Everything a command needs to build a [`Session`].
pub(crate) struct Environment {
    pub config: Config,
    pub cache: PackageCache,
    pub remotes: Remotes,
    pub manager: FileRemoteManager,
    pub loader: TomlRecipeLoader,
    pub verbosity: Verbosity,
}

impl Environment {
    /// Load the configuration of the selected home.
    pub fn load(ctx: &Context) -> Result<Self> {
        let config = Config::load(ctx.home.as_deref()).context("Failed to load configuration")?;
        tracing::debug!(home = %config.home().display(), "configuration loaded");
        Ok(Self {
            cache: PackageCache::from_config(&config),
            remotes: Remotes::from_config(&config),
            manager: FileRemoteManager::new(),
            loader: TomlRecipeLoader::new(),
            verbosity: Verbosity::from_flags(ctx.quiet, ctx.debug),
            config,
        })
    }

    pub fn session(&self) -> Session<'_> {
        Session::new(&self.cache, &self.remotes, &self.manager, &self.loader)
    }
}

/// Parse a reference given on the command line.
pub(crate) fn parse_reference(text: &str) -> Result<Reference> {
    Reference::parse(text).with_context(|| format!("Invalid reference '{}'", text))
}

/// Run an async handler on a fresh runtime.
pub(crate) fn block_on<T, F: std::future::Future<Output = Result<T>>>(future: F) -> Result<T> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(future)
}
