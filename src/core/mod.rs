//! core
//!
//! Core domain types, storage layout and persistence.
//!
//! # Modules
//!
//! - [`reference`] - Recipe and package references
//! - [`version`] - Version parsing and ordering
//! - [`paths`] - Folder layout of one reference in the cache
//! - [`pattern`] - Wildcard search over references
//! - [`cache`] - The package cache root and its queries
//! - [`ops`] - Dirty markers and atomic folder installs
//! - [`manifest`] - File checksums and content revisions
//! - [`metadata`] - Per-reference metadata and its scoped store
//! - [`graph`] - Dependency graph produced by a resolution
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid references at construction
//! - Schemas are strict and self-describing
//! - Every write to a managed folder is crash-safe

pub mod cache;
pub mod config;
pub mod graph;
pub mod manifest;
pub mod metadata;
pub mod ops;
pub mod paths;
pub mod pattern;
pub mod reference;
pub mod version;
