//! export command - Export a recipe folder into the cache

use std::path::Path;

use anyhow::{Context as _, Result};

use super::helpers::{parse_reference, Environment};
use crate::engine::{export_recipe, Context};
use crate::ui::output;

/// Export the recipe in `dir` as `reference`.
pub fn export(ctx: &Context, dir: &Path, reference: &str, revision: Option<&str>) -> Result<()> {
    let env = Environment::load(ctx)?;
    let reference = parse_reference(reference)?;

    let outcome = export_recipe(&env.session(), dir, &reference, revision)
        .with_context(|| format!("Failed to export '{}'", reference))?;

    let note = if outcome.revision_changed {
        ""
    } else {
        " (unchanged)"
    };
    output::print(
        format!("Exported {}{}", outcome.reference.full_text(), note),
        env.verbosity,
    );
    Ok(())
}
