//! complete-sources command - Fetch missing bundled sources

use anyhow::{Context as _, Result};

use super::helpers::{block_on, parse_reference, Environment};
use crate::engine::{complete_sources as complete, Context, SourcesOutcome};
use crate::ui::output;

/// Make sure the bundled sources of `reference` are in the cache.
pub fn complete_sources(ctx: &Context, reference: &str) -> Result<()> {
    let env = Environment::load(ctx)?;
    let reference = parse_reference(reference)?;

    let outcome = block_on(async {
        complete(&env.session(), &reference)
            .await
            .with_context(|| format!("Failed to complete sources of '{}'", reference))
    })?;

    let message = match outcome {
        SourcesOutcome::AlreadyPresent => "Sources already present".to_string(),
        SourcesOutcome::CreatedEmpty => "Recipe bundles no sources".to_string(),
        SourcesOutcome::Fetched { remote } => format!("Sources fetched from '{}'", remote),
    };
    output::print(message, env.verbosity);
    Ok(())
}
