//! Stowage - a revisioned package cache and dependency graph resolver
//!
//! Stowage keeps recipes, their bundled sources and their prebuilt binaries
//! in a local cache, retrieves what is missing from remotes, and resolves
//! the dependency graph of a set of requirements with version ranges,
//! overrides and private dependencies. The `stow` binary is its CLI.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Graph building, recipe lookup, source completion, export, copy, download
//! - [`core`] - References, cache layout, metadata, manifests, configuration
//! - [`range`] - Version range expressions and their resolution
//! - [`recipe`] - Recipe capability trait and the `recipe.toml` loader
//! - [`remote`] - Remote transport abstraction and registry
//! - [`ui`] - User interaction utilities
//!
//! # Correctness Invariants
//!
//! 1. A managed folder is either complete or marked dirty; dirty folders
//!    are wiped and rebuilt on next access
//! 2. Metadata is only changed through scoped, all-or-nothing updates
//! 3. A dependency graph is acyclic and holds one node per name per
//!    visibility scope
//! 4. No state outlives a resolution call

pub mod cli;
pub mod core;
pub mod engine;
pub mod range;
pub mod recipe;
pub mod remote;
pub mod ui;
