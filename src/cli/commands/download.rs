//! download command - Fetch a recipe, sources and binaries from one remote

use anyhow::{Context as _, Result};

use super::helpers::{block_on, parse_reference, Environment};
use crate::engine::{download as fetch, Context};
use crate::ui::output;

/// Download `reference` from `remote`.
pub fn download(
    ctx: &Context,
    reference: &str,
    remote: &str,
    packages: Vec<String>,
    recipe_only: bool,
) -> Result<()> {
    let env = Environment::load(ctx)?;
    let reference = parse_reference(reference)?;
    let ids = (!packages.is_empty()).then_some(packages);

    let report = block_on(async {
        fetch(&env.session(), &reference, remote, ids, recipe_only)
            .await
            .with_context(|| format!("Failed to download '{}' from '{}'", reference, remote))
    })?;

    output::print(format!("Downloaded {}", report.reference.full_text()), env.verbosity);
    for package in &report.packages {
        output::print(format!("  {}", package.full_text()), env.verbosity);
    }
    Ok(())
}
