//! copy command - Promote a recipe to another user/channel

use anyhow::{bail, Context as _, Result};

use super::helpers::{block_on, parse_reference, Environment};
use crate::engine::{copy_package, Context, PackageSelection};
use crate::ui::output;
use crate::ui::prompts::TerminalConfirm;

/// Copy `reference` to `destination` (`user/channel`).
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `reference` - Reference to copy
/// * `destination` - Target `user/channel`
/// * `all` - Copy every installed binary
/// * `packages` - Binaries to copy when `all` is false
/// * `force` - Overwrite without asking
pub fn copy(
    ctx: &Context,
    reference: &str,
    destination: &str,
    all: bool,
    packages: Vec<String>,
    force: bool,
) -> Result<()> {
    let env = Environment::load(ctx)?;
    let reference = parse_reference(reference)?;
    let Some((user, channel)) = destination.split_once('/') else {
        bail!("Destination must be user/channel, got '{}'", destination);
    };

    let selection = if all {
        PackageSelection::All
    } else if packages.is_empty() {
        PackageSelection::None
    } else {
        PackageSelection::Ids(packages)
    };
    let confirm = TerminalConfirm {
        interactive: ctx.interactive,
    };

    let report = block_on(async {
        copy_package(
            &env.session(),
            &reference,
            user,
            channel,
            &selection,
            force,
            &confirm,
        )
        .await
        .with_context(|| format!("Failed to copy '{}'", reference))
    })?;

    let Some(dest) = report.reference.as_ref().filter(|_| report.recipe_copied) else {
        output::warn("Copy skipped, destination left untouched", env.verbosity);
        return Ok(());
    };
    output::print(format!("Copied {} to {}", reference, dest), env.verbosity);
    if !report.packages_copied.is_empty() {
        output::print(output::format_list(&report.packages_copied, "  + "), env.verbosity);
    }
    if !report.packages_skipped.is_empty() {
        output::print(output::format_list(&report.packages_skipped, "  - "), env.verbosity);
    }
    Ok(())
}
