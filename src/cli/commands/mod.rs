//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads the configuration and opens the cache
//! 2. Calls the engine to execute the command
//! 3. Formats and displays output
//!
//! Handlers do NOT touch cache folders directly.
//!
//! # Async Commands
//!
//! Commands that may talk to remotes (resolve, complete-sources, copy,
//! download, remote search) are async underneath. They run on a
//! `tokio::runtime::Runtime` created for the call.

mod copy;
mod download;
mod export;
mod helpers;
mod info;
mod paths;
mod register;
mod remote;
mod resolve;
mod search;
mod sources;

// Re-export command functions for testing and direct invocation
pub use copy::copy;
pub use download::download;
pub use export::export;
pub use info::info;
pub use paths::paths;
pub use register::register;
pub use remote::{add as remote_add, list as remote_list, remove as remote_remove};
pub use resolve::resolve;
pub use search::search;
pub use sources::complete_sources;

use crate::cli::args::{Command, RemoteAction};
use crate::engine::Context;
use anyhow::Result;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Resolve {
            recipe,
            update,
            remote,
            decisions,
        } => resolve::resolve(ctx, &recipe, update, remote.as_deref(), decisions),
        Command::Paths { reference, package } => {
            paths::paths(ctx, &reference, package.as_deref())
        }
        Command::Info { reference } => info::info(ctx, &reference),
        Command::Search {
            pattern,
            remote,
            case_sensitive,
        } => search::search(ctx, pattern.as_deref(), remote.as_deref(), case_sensitive),
        Command::Export {
            dir,
            reference,
            revision,
        } => export::export(ctx, &dir, &reference, revision.as_deref()),
        Command::Register {
            reference,
            package_id,
            dir,
        } => register::register(ctx, &reference, &package_id, &dir),
        Command::CompleteSources { reference } => sources::complete_sources(ctx, &reference),
        Command::Copy {
            reference,
            destination,
            all,
            packages,
            force,
        } => copy::copy(ctx, &reference, &destination, all, packages, force),
        Command::Download {
            reference,
            remote,
            packages,
            recipe_only,
        } => download::download(ctx, &reference, &remote, packages, recipe_only),
        Command::Remote { action } => match action {
            RemoteAction::List => remote::list(ctx),
            RemoteAction::Add { name, url } => remote::add(ctx, &name, &url),
            RemoteAction::Remove { name } => remote::remove(ctx, &name),
        },
    }
}
