//! search command - Find references by wildcard pattern, locally or in a remote

use anyhow::{Context as _, Result};

use super::helpers::{block_on, Environment};
use crate::core::pattern::ReferencePattern;
use crate::engine::Context;
use crate::remote::RemoteManager;
use crate::ui::output;

/// List references matching `pattern`, locally or in `remote`.
///
/// No pattern lists everything.
pub fn search(
    ctx: &Context,
    pattern: Option<&str>,
    remote: Option<&str>,
    case_sensitive: bool,
) -> Result<()> {
    let env = Environment::load(ctx)?;
    let pattern = match pattern {
        None => ReferencePattern::any(),
        Some(text) if case_sensitive => ReferencePattern::case_sensitive(text)?,
        Some(text) => ReferencePattern::new(text)?,
    };

    let found = match remote {
        None => env
            .cache
            .search_pattern(&pattern)
            .context("Failed to search the cache")?,
        Some(name) => {
            let remote = env.remotes.require(name)?;
            block_on(async {
                env.manager
                    .search_pattern(&pattern, remote)
                    .await
                    .with_context(|| format!("Failed to search remote '{}'", name))
            })?
        }
    };

    if found.is_empty() {
        output::print(
            format!("There are no packages matching the '{}' pattern", pattern.as_str()),
            env.verbosity,
        );
        return Ok(());
    }
    output::print("Existing package recipes:\n", env.verbosity);
    output::print(output::format_list(&found, ""), env.verbosity);
    Ok(())
}
