//! remote command - List, add or remove configured remotes

use anyhow::{Context as _, Result};

use super::helpers::Environment;
use crate::engine::Context;
use crate::ui::output;

/// List remotes in priority order.
pub fn list(ctx: &Context) -> Result<()> {
    let env = Environment::load(ctx)?;
    let default = env.config.default_remote();
    for remote in env.config.remotes() {
        let marker = if Some(remote.name.as_str()) == default {
            " (default)"
        } else {
            ""
        };
        println!("{}: {}{}", remote.name, remote.url, marker);
    }
    Ok(())
}

/// Append a remote to the configuration.
pub fn add(ctx: &Context, name: &str, url: &str) -> Result<()> {
    let mut env = Environment::load(ctx)?;
    env.config
        .add_remote(name, url)
        .with_context(|| format!("Cannot add remote '{}'", name))?;
    let path = env.config.save().context("Failed to write configuration")?;
    output::print(
        format!("Added remote '{}' to {}", name, path.display()),
        env.verbosity,
    );
    Ok(())
}

/// Remove a remote from the configuration.
pub fn remove(ctx: &Context, name: &str) -> Result<()> {
    let mut env = Environment::load(ctx)?;
    env.config
        .remove_remote(name)
        .with_context(|| format!("Cannot remove remote '{}'", name))?;
    env.config.save().context("Failed to write configuration")?;
    output::print(format!("Removed remote '{}'", name), env.verbosity);
    Ok(())
}
