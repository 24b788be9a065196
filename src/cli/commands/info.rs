//! info command - Show what the cache holds for a reference

use anyhow::{bail, Context as _, Result};

use super::helpers::{parse_reference, Environment};
use crate::core::manifest::FileManifest;
use crate::core::metadata::schema::PackageStatus;
use crate::engine::Context;
use crate::ui::output;

/// Display revisions, origin and binaries of `reference`.
pub fn info(ctx: &Context, reference: &str) -> Result<()> {
    let env = Environment::load(ctx)?;
    let reference = parse_reference(reference)?;
    let paths = env.cache.layout_for(&reference);
    if !paths.has_recipe() {
        bail!("'{}' is not in the cache", reference);
    }

    let meta = env
        .cache
        .metadata(&reference)
        .load()
        .context("Failed to read metadata")?;

    println!("Reference: {}", reference);
    println!(
        "Revision: {}",
        meta.recipe.revision.as_deref().unwrap_or("(none)")
    );
    println!("Remote: {}", meta.recipe.remote.as_deref().unwrap_or("(local)"));
    match FileManifest::saved_at(&paths.export()) {
        Ok(Some(time)) => println!("Exported: {}", time.format("%Y-%m-%d %H:%M:%S UTC")),
        Ok(None) => {}
        Err(e) => output::debug(format!("no export manifest: {}", e), env.verbosity),
    }

    let ids = env
        .cache
        .list_packages(&reference)
        .context("Failed to list binaries")?;
    if ids.is_empty() {
        println!("Packages: (none)");
        return Ok(());
    }
    println!("Packages:");
    for id in ids {
        let revision = meta
            .packages
            .get(&id)
            .and_then(|p| p.revision.as_deref())
            .unwrap_or("(none)");
        let status = match meta.package_status(&id) {
            PackageStatus::Current => "",
            PackageStatus::Outdated { .. } => " (outdated)",
            PackageStatus::Unknown => " (unknown)",
        };
        println!("  {} #{}{}", id, revision, status);
    }
    Ok(())
}
