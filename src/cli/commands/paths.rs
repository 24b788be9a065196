//! paths command - Show the cache folders of a reference

use anyhow::Result;

use super::helpers::{parse_reference, Environment};
use crate::engine::Context;

/// Print the folders the cache uses for `reference`.
pub fn paths(ctx: &Context, reference: &str, package: Option<&str>) -> Result<()> {
    let env = Environment::load(ctx)?;
    let reference = parse_reference(reference)?;
    let paths = env.cache.layout_for(&reference);

    println!("base: {}", paths.base().display());
    println!("export: {}", paths.export().display());
    println!("export_source: {}", paths.export_sources().display());
    println!("source: {}", paths.source().display());
    println!("metadata: {}", paths.metadata_file().display());
    if let Some(id) = package {
        println!("build: {}", paths.build(id).display());
        println!("package: {}", paths.package(id).display());
    }
    Ok(())
}
