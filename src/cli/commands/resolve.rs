//! resolve command - Build and print the dependency graph of a recipe

use std::path::Path;

use anyhow::{Context as _, Result};

use super::helpers::{block_on, Environment};
use crate::engine::{Context, GraphBuilder};
use crate::range::UpdatePolicy;
use crate::recipe::RecipeLoader;
use crate::ui::output;

/// Resolve the requirements of the recipe at `recipe`.
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `recipe` - Path to a `recipe.toml`
/// * `update` - Check remotes for range candidates
/// * `remote` - Restrict remote lookups to this remote
/// * `decisions` - Print the decision log
pub fn resolve(
    ctx: &Context,
    recipe: &Path,
    update: bool,
    remote: Option<&str>,
    decisions: bool,
) -> Result<()> {
    let env = Environment::load(ctx)?;
    block_on(resolve_async(&env, recipe, update, remote, decisions))
}

async fn resolve_async(
    env: &Environment,
    recipe: &Path,
    update: bool,
    remote: Option<&str>,
    show_decisions: bool,
) -> Result<()> {
    let consumer = env
        .loader
        .load(recipe)
        .with_context(|| format!("Failed to load recipe '{}'", recipe.display()))?;

    let policy = if update {
        UpdatePolicy::check_remote(remote.map(str::to_string))
    } else {
        UpdatePolicy {
            check_remote: false,
            remote: remote.map(str::to_string),
        }
    };

    let mut builder = GraphBuilder::new(env.session(), policy);
    let result = builder.build(&consumer.requirements()).await;

    if show_decisions {
        output::print("Decisions:", env.verbosity);
        output::print(output::format_decisions(builder.decisions()), env.verbosity);
    }
    let resolution = result.context("Failed to resolve dependency graph")?;

    let rendered = output::format_graph(&resolution.graph);
    if !rendered.is_empty() {
        output::print(rendered, env.verbosity);
    }
    for decision in resolution.overridden() {
        output::warn(decision, env.verbosity);
    }
    Ok(())
}
