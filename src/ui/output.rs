//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag. Results go
//! to stdout; warnings, errors and debug lines go to stderr.

use std::fmt::Display;

use crate::core::graph::DepsGraph;
use crate::engine::Decision;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print a debug message (only in debug mode).
pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity == Verbosity::Debug {
        eprintln!("[debug] {}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a graph level by level, leaves first.
///
/// Each line is `<level>: <reference> [<remote>]`, with private nodes
/// marked.
pub fn format_graph(graph: &DepsGraph) -> String {
    let mut lines = Vec::new();
    for (level, ids) in graph.by_levels().iter().enumerate() {
        for id in ids {
            let Some(node) = graph.node(*id) else { continue };
            let Some(reference) = node.reference() else { continue };
            let mut line = format!("{}: {}", level, reference.full_text());
            if let Some(remote) = node.remote() {
                line.push_str(&format!(" [{}]", remote));
            }
            if node.is_private() {
                line.push_str(" (private)");
            }
            lines.push(line);
        }
    }
    lines.join("\n")
}

/// Render the decision log, one entry per line.
pub fn format_decisions(decisions: &[Decision]) -> String {
    format_list(decisions, "  ")
}
