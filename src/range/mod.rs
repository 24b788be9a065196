//! range
//!
//! Version range expressions and their resolution against known versions.
//!
//! # Modules
//!
//! - [`expr`] - Parsing and evaluating range expressions
//! - [`resolver`] - Candidate gathering and per-build memoisation

pub mod expr;
pub mod resolver;

pub use expr::{RangeError, VersionRange};
pub use resolver::{RangeQuery, RangeResolver, ResolveError, UpdatePolicy};
