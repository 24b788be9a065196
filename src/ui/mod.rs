//! ui
//!
//! User interaction utilities.
//!
//! # Modules
//!
//! - [`prompts`] - Yes/no questions asked before overwriting cache entries
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! All output and prompts go through this module so quiet and
//! non-interactive modes are honoured in one place.

pub mod output;
pub mod prompts;
