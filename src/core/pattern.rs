//! core::pattern
//!
//! Wildcard patterns over recipe references, used by `search`.
//!
//! A pattern is a shell-style wildcard (`*`, `?`, `[...]`) matched against
//! the text form `name/version@user/channel`. Matching is case-insensitive
//! unless asked otherwise, and `*` crosses the `/` and `@` separators.
//!
//! A pattern without wildcards may also name a leading part of the
//! reference, cut at a separator: `say`, `say/`, `say/0.1@` and
//! `say/0.1@myuser` all find `say/0.1@myuser/testing`, while `sa` and
//! `say/0` find nothing.
//!
//! # Example
//!
//! ```
//! use stowage::core::pattern::ReferencePattern;
//! use stowage::core::reference::Reference;
//!
//! let say = Reference::parse("Say/0.1@myuser/testing").unwrap();
//! assert!(ReferencePattern::new("say*").unwrap().matches(&say));
//! assert!(ReferencePattern::new("*@myuser/*").unwrap().matches(&say));
//! assert!(ReferencePattern::new("Say/0.1").unwrap().matches(&say));
//! assert!(!ReferencePattern::new("Sa").unwrap().matches(&say));
//! assert!(!ReferencePattern::case_sensitive("say*").unwrap().matches(&say));
//! ```

use glob::{MatchOptions, Pattern};
use thiserror::Error;

use crate::core::reference::Reference;

/// Errors from pattern parsing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid search pattern '{pattern}': {reason}")]
pub struct PatternError {
    pub pattern: String,
    pub reason: String,
}

/// Compiled reference pattern.
#[derive(Debug, Clone)]
pub struct ReferencePattern {
    text: String,
    /// `None` matches every reference.
    pattern: Option<Pattern>,
    options: MatchOptions,
}

impl ReferencePattern {
    /// Case-insensitive pattern.
    pub fn new(text: &str) -> Result<Self, PatternError> {
        Self::compile(text, false)
    }

    /// Pattern that distinguishes `Say` from `say`.
    pub fn case_sensitive(text: &str) -> Result<Self, PatternError> {
        Self::compile(text, true)
    }

    /// Pattern matching every reference.
    pub fn any() -> Self {
        Self {
            text: "*".to_string(),
            pattern: None,
            options: MatchOptions::new(),
        }
    }

    fn compile(text: &str, case_sensitive: bool) -> Result<Self, PatternError> {
        let text = text.trim();
        let pattern = Pattern::new(text).map_err(|e| PatternError {
            pattern: text.to_string(),
            reason: e.msg.to_string(),
        })?;
        Ok(Self {
            text: text.to_string(),
            pattern: Some(pattern),
            options: MatchOptions {
                case_sensitive,
                require_literal_separator: false,
                require_literal_leading_dot: false,
            },
        })
    }

    /// The pattern as given.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether `reference` matches.
    pub fn matches(&self, reference: &Reference) -> bool {
        let Some(pattern) = &self.pattern else {
            return true;
        };
        let full = reference.to_string();
        let matched = candidates(&full).any(|part| pattern.matches_with(part, self.options));
        matched
    }
}

/// The full text plus every prefix ending just before or just after a
/// separator.
fn candidates(full: &str) -> impl Iterator<Item = &str> {
    full.char_indices()
        .filter(|(_, c)| *c == '/' || *c == '@')
        .flat_map(move |(i, c)| [&full[..i], &full[..i + c.len_utf8()]])
        .chain(std::iter::once(full))
}
