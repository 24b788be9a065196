//! cli
//!
//! Command-line interface layer for stow.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Delegate to command handlers
//! - Does NOT modify the cache directly
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to the
//! [`crate::engine`] for execution. Errors are reported with `anyhow`
//! context chains.

pub mod args;
pub mod commands;

pub use args::Cli;

use crate::engine;
use anyhow::Result;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);

    let ctx = engine::Context {
        home: cli.home.clone(),
        debug: cli.debug,
        quiet: cli.quiet,
        interactive: cli.interactive(),
    };

    commands::dispatch(cli.command, &ctx)
}

/// Install the log subscriber.
///
/// `STOW_LOG` takes an `EnvFilter` directive; without it the level is
/// `warn`, or `debug` with `--debug`.
fn init_tracing(debug: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("STOW_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
