//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--home <dir>`: Use this stow home instead of `$STOW_HOME` / `~/.stow`
//! - `--debug`: Enable debug logging
//! - `--no-interactive`: Never prompt; questions take their default answer
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Stow - revisioned package cache and dependency resolver
#[derive(Parser, Debug)]
#[command(name = "stow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Stow home directory (holds config.toml and the cache)
    #[arg(long, global = true, value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output; implies --no-interactive
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable interactive prompts
    #[arg(long, global = true)]
    pub no_interactive: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Determine if interactive mode is enabled.
    ///
    /// False with `--no-interactive` or `--quiet`, otherwise true when stdin
    /// is a terminal.
    pub fn interactive(&self) -> bool {
        if self.no_interactive || self.quiet {
            false
        } else {
            std::io::stdin().is_terminal()
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve the dependency graph of a recipe
    #[command(
        name = "resolve",
        long_about = "Resolve the dependency graph of a recipe.\n\n\
            Reads the requirements of the given recipe.toml and builds the full \
            graph: version ranges are resolved to the highest matching version, \
            shared dependencies are unified, overrides are applied and private \
            requirements are kept out of conflict checks. Recipes missing from \
            the cache are retrieved from the configured remotes.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Resolve against the local cache (remotes only for missing recipes)
    stow resolve ./recipe.toml

    # Also look for newer versions matching ranges in the remotes
    stow resolve ./recipe.toml --update

    # Restrict remote lookups to one remote and show why each node was chosen
    stow resolve ./recipe.toml --update --remote local --decisions

READING THE OUTPUT:
    0: say/0.1@myuser/testing#r1 [local]   <- leaves first, retrieved from 'local'
    1: hello/1.2@myuser/testing#r7"
    )]
    Resolve {
        /// Recipe file whose requirements are resolved
        recipe: PathBuf,

        /// Check remotes for range candidates
        #[arg(long)]
        update: bool,

        /// Only consult this remote
        #[arg(short, long)]
        remote: Option<String>,

        /// Print the decision log
        #[arg(long)]
        decisions: bool,
    },

    /// Show the cache folders of a reference
    Paths {
        /// Reference (name/version@user/channel)
        reference: String,

        /// Also show the folders of this binary
        #[arg(short, long)]
        package: Option<String>,
    },

    /// Show revisions, origin remote and binaries of a cached reference
    #[command(
        name = "info",
        long_about = "Show what the cache holds for a reference.\n\n\
            Prints the recipe revision, the remote it was retrieved from, when \
            its export was written, and every installed binary with its revision. \
            Binaries built against an older recipe revision are flagged as outdated."
    )]
    Info {
        /// Reference (name/version@user/channel)
        reference: String,
    },

    /// Search cached references, or a remote, by wildcard pattern
    #[command(
        name = "search",
        long_about = "Search recipe references by wildcard pattern.\n\n\
            The pattern is matched against name/version@user/channel, ignoring \
            case unless --case-sensitive is given. A pattern without wildcards \
            also matches a leading part of the reference cut at a separator, so \
            'say' and 'say/0.1@' both find say/0.1@myuser/testing.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Everything in the local cache
    stow search

    # Every version of opencv, any user/channel
    stow search 'opencv/*'

    # Stable channels in one remote
    stow search '*@*/stable' --remote origin"
    )]
    Search {
        /// Wildcard pattern (default: every reference)
        pattern: Option<String>,

        /// Search this remote instead of the local cache
        #[arg(short, long)]
        remote: Option<String>,

        /// Distinguish upper and lower case
        #[arg(long)]
        case_sensitive: bool,
    },

    /// Export a recipe folder into the cache
    #[command(
        name = "export",
        after_help = "\
WORKFLOW EXAMPLES:
    # Export the recipe in the current folder
    stow export . hello/1.2@myuser/testing

    # Export under a fixed revision
    stow export ./hello hello/1.2@myuser/testing --revision r1"
    )]
    Export {
        /// Folder holding recipe.toml
        dir: PathBuf,

        /// Reference to export as
        reference: String,

        /// Use this revision instead of the content checksum
        #[arg(long)]
        revision: Option<String>,
    },

    /// Install a built binary folder for a cached recipe
    Register {
        /// Reference the binary was built from
        reference: String,

        /// Binary configuration id
        package_id: String,

        /// Folder holding the built binary
        dir: PathBuf,
    },

    /// Fetch the bundled sources of a cached recipe if missing
    CompleteSources {
        /// Reference (name/version@user/channel)
        reference: String,
    },

    /// Copy a recipe and its binaries to another user/channel
    #[command(
        name = "copy",
        long_about = "Copy a recipe, and optionally its binaries, to another user/channel.\n\n\
            Existing destinations are only overwritten after confirmation or with \
            --force. Declining the recipe skips the whole copy; declining a binary \
            skips just that binary.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Promote a recipe from testing to stable
    stow copy say/0.1@lasote/testing lasote/stable

    # Promote with every binary, overwriting without asking
    stow copy say/0.1@lasote/testing lasote/stable --all --force"
    )]
    Copy {
        /// Reference to copy
        reference: String,

        /// Destination as user/channel
        destination: String,

        /// Copy every installed binary
        #[arg(long, conflicts_with = "packages")]
        all: bool,

        /// Copy these binaries
        #[arg(short, long = "package", value_name = "ID")]
        packages: Vec<String>,

        /// Overwrite without asking
        #[arg(short, long)]
        force: bool,
    },

    /// Download a recipe, its sources and binaries from a remote
    Download {
        /// Reference to download
        reference: String,

        /// Remote to download from
        #[arg(short, long)]
        remote: String,

        /// Only these binaries (default: every binary the remote lists)
        #[arg(short, long = "package", value_name = "ID", conflicts_with = "recipe_only")]
        packages: Vec<String>,

        /// Skip binaries
        #[arg(long)]
        recipe_only: bool,
    },

    /// Manage configured remotes
    Remote {
        #[command(subcommand)]
        action: RemoteAction,
    },
}

/// Remote subcommands.
#[derive(Subcommand, Debug)]
pub enum RemoteAction {
    /// List remotes in priority order
    List,

    /// Append a remote
    Add {
        /// Remote name
        name: String,

        /// Remote URL (a directory or file:// URL)
        url: String,
    },

    /// Remove a remote
    Remove {
        /// Remote name
        name: String,
    },
}
