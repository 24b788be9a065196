//! register command - Install a built binary folder

use std::path::Path;

use anyhow::{Context as _, Result};

use super::helpers::{parse_reference, Environment};
use crate::engine::{register_package, Context};
use crate::ui::output;

/// Install `dir` as binary `package_id` of `reference`.
pub fn register(ctx: &Context, reference: &str, package_id: &str, dir: &Path) -> Result<()> {
    let env = Environment::load(ctx)?;
    let reference = parse_reference(reference)?;

    let package = register_package(&env.session(), &reference, package_id, dir)
        .with_context(|| format!("Failed to register '{}' for '{}'", package_id, reference))?;
    output::print(format!("Registered {}", package.full_text()), env.verbosity);
    Ok(())
}
