//! Architecture enforcement tests.
//!
//! Command handlers are thin: every change to a cache folder goes through
//! the engine, which owns the dirty-marker and staging protocol. A handler
//! that writes into the cache itself could leave a half-written folder
//! without a marker. These tests scan the handler sources to catch that.
//!
//! # Test Categories
//!
//! 1. **Ops Import Detection** - Handlers must not import `core::ops`
//! 2. **Filesystem Mutation Detection** - Handlers must not write files
//! 3. **Metadata Detection** - Handlers must not update metadata directly

use std::fs;
use std::path::Path;

/// Files that are not command handlers.
const EXCLUDED_FILES: &[&str] = &["mod.rs", "helpers.rs"];

/// Filesystem calls that mutate the tree.
const MUTATING_CALLS: &[&str] = &[
    "fs::write",
    "fs::remove_dir_all",
    "fs::remove_file",
    "fs::rename",
    "fs::create_dir_all",
    "fs::copy",
];

/// Handler sources as (file name, content).
fn handler_sources() -> Vec<(String, String)> {
    let command_dir = Path::new("src/cli/commands");
    let mut sources = Vec::new();

    for entry in fs::read_dir(command_dir).expect("Failed to read commands directory") {
        let entry = entry.expect("Failed to read entry");
        let path = entry.path();
        if !path.extension().map(|e| e == "rs").unwrap_or(false) {
            continue;
        }
        let filename = path.file_name().unwrap().to_str().unwrap().to_string();
        if EXCLUDED_FILES.contains(&filename.as_str()) {
            continue;
        }
        let content =
            fs::read_to_string(&path).unwrap_or_else(|_| panic!("Failed to read {}", filename));
        sources.push((filename, content));
    }
    sources
}

fn report(violations: &[String], what: &str) {
    if !violations.is_empty() {
        panic!(
            "Architecture violations found ({}):\n{}",
            what,
            violations.join("\n")
        );
    }
}

// =============================================================================
// Ops Import Detection
// =============================================================================

#[test]
fn handlers_cannot_use_cache_ops() {
    let violations: Vec<String> = handler_sources()
        .into_iter()
        .filter(|(_, content)| content.contains("core::ops"))
        .map(|(file, _)| format!("{}: imports core::ops - go through the engine", file))
        .collect();
    report(&violations, "cache ops in handlers");
}

// =============================================================================
// Filesystem Mutation Detection
// =============================================================================

#[test]
fn handlers_do_not_write_files() {
    let mut violations = Vec::new();
    for (file, content) in handler_sources() {
        for call in MUTATING_CALLS {
            if content.contains(call) {
                violations.push(format!("{}: calls {}", file, call));
            }
        }
    }
    report(&violations, "filesystem mutations in handlers");
}

// =============================================================================
// Metadata Detection
// =============================================================================

#[test]
fn handlers_only_read_metadata() {
    let violations: Vec<String> = handler_sources()
        .into_iter()
        .filter(|(_, content)| content.contains(".update(") || content.contains(".write(&"))
        .map(|(file, _)| format!("{}: mutates metadata directly", file))
        .collect();
    report(&violations, "metadata writes in handlers");
}

#[test]
fn every_handler_is_dispatched() {
    let dispatch = fs::read_to_string("src/cli/commands/mod.rs").expect("Failed to read mod.rs");
    for (file, _) in handler_sources() {
        let module = file.trim_end_matches(".rs");
        assert!(
            dispatch.contains(&format!("mod {};", module)),
            "{} is not declared in commands/mod.rs",
            file
        );
        assert!(
            dispatch.contains(&format!("{}::", module)),
            "{} is never dispatched",
            file
        );
    }
}
