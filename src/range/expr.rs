//! range::expr
//!
//! Version range expressions.
//!
//! # Grammar
//!
//! ```text
//! range       := alternative ( "||" alternative )*
//! alternative := ( comparator ( "," | " " )+ )*
//! comparator  := op? version | "~" version | "~=" version | "*"
//! op          := ">" | "<" | ">=" | "<=" | "="
//! ```
//!
//! An empty alternative matches every release. Versions written with fewer
//! than three components follow X-range rules: `=1.1` is `>=1.1 <1.2`,
//! `<=1.2` is `<1.3` and `>1.2` is `>=1.3`.
//!
//! `~V` allows changes below the minor component (below the major one when
//! `V` is a single number). `~=V` allows changes below the last component
//! written.
//!
//! Prerelease versions only match alternatives that mention a prerelease.
//!
//! # Example
//!
//! ```
//! use stowage::core::version::Version;
//! use stowage::range::VersionRange;
//!
//! let range = VersionRange::parse(">0.1,<1 || 2.1").unwrap();
//! assert!(range.satisfies(&Version::parse("0.3").unwrap()));
//! assert!(range.satisfies(&Version::parse("2.1").unwrap()));
//! assert!(!range.satisfies(&Version::parse("1.2").unwrap()));
//! ```

use std::cmp::Ordering;

use thiserror::Error;

use crate::core::version::Version;

/// Errors from range parsing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("invalid version range '{expression}': {reason}")]
    Invalid { expression: String, reason: String },
}

/// Minimum precision at which comparators are taken literally.
const FULL_PRECISION: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
}

#[derive(Debug, Clone)]
struct Comparator {
    op: Op,
    version: Version,
}

impl Comparator {
    fn matches(&self, version: &Version) -> bool {
        let ord = version.cmp(&self.version);
        match self.op {
            Op::Gt => ord == Ordering::Greater,
            Op::Ge => ord != Ordering::Less,
            Op::Lt => ord == Ordering::Less,
            Op::Le => ord != Ordering::Greater,
            Op::Eq => ord == Ordering::Equal,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Alternative {
    comparators: Vec<Comparator>,
    allows_prerelease: bool,
}

impl Alternative {
    fn matches(&self, version: &Version) -> bool {
        if version.is_prerelease() && !self.allows_prerelease {
            return false;
        }
        self.comparators.iter().all(|c| c.matches(version))
    }
}

/// A parsed range expression. Stateless; evaluate it as often as needed.
#[derive(Debug, Clone)]
pub struct VersionRange {
    text: String,
    alternatives: Vec<Alternative>,
}

impl VersionRange {
    /// Parse a range expression.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError::Invalid`] for dangling operators, malformed
    /// versions and characters outside the grammar.
    pub fn parse(text: &str) -> Result<Self, RangeError> {
        let text = text.trim();
        let invalid = |reason: String| RangeError::Invalid {
            expression: text.to_string(),
            reason,
        };

        let mut alternatives = Vec::new();
        for raw in text.split("||") {
            alternatives.push(parse_alternative(raw).map_err(invalid)?);
        }

        Ok(Self {
            text: text.to_string(),
            alternatives,
        })
    }

    /// The expression as written (trimmed).
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether the range accepts every release.
    pub fn is_unconstrained(&self) -> bool {
        self.alternatives.iter().any(|a| a.comparators.is_empty())
    }

    /// Whether `version` falls inside the range.
    pub fn satisfies(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|a| a.matches(version))
    }

    /// The highest candidate inside the range.
    pub fn best_match<'a, I>(&self, candidates: I) -> Option<&'a Version>
    where
        I: IntoIterator<Item = &'a Version>,
    {
        candidates
            .into_iter()
            .filter(|v| self.satisfies(v))
            .max()
    }
}

impl std::fmt::Display for VersionRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl std::str::FromStr for VersionRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialEq for VersionRange {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for VersionRange {}

// =============================================================================
// Parsing
// =============================================================================

fn parse_alternative(raw: &str) -> Result<Alternative, String> {
    let mut alternative = Alternative::default();
    let mut tokens = raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty());

    while let Some(token) = tokens.next() {
        if token == "*" {
            continue;
        }
        let (op, rest) = split_operator(token);
        // Allow a space between operator and version: ">= 1.2"
        let version_text = if rest.is_empty() {
            match tokens.next() {
                Some(next) => next,
                None => return Err(format!("operator '{}' without a version", token)),
            }
        } else {
            rest
        };

        let version = parse_version(version_text)?;
        if version.is_prerelease() {
            alternative.allows_prerelease = true;
        }
        expand(op, version, &mut alternative.comparators);
    }

    Ok(alternative)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Cmp(Op),
    Tilde,
    Compatible,
}

fn split_operator(token: &str) -> (Token, &str) {
    const OPERATORS: [(&str, Token); 7] = [
        ("~=", Token::Compatible),
        ("~", Token::Tilde),
        (">=", Token::Cmp(Op::Ge)),
        ("<=", Token::Cmp(Op::Le)),
        (">", Token::Cmp(Op::Gt)),
        ("<", Token::Cmp(Op::Lt)),
        ("=", Token::Cmp(Op::Eq)),
    ];
    for (prefix, op) in OPERATORS {
        if let Some(rest) = token.strip_prefix(prefix) {
            return (op, rest);
        }
    }
    (Token::Cmp(Op::Eq), token)
}

fn parse_version(text: &str) -> Result<Version, String> {
    let first = text.chars().next();
    if !first.is_some_and(|c| c.is_ascii_alphanumeric()) {
        return Err(format!("'{}' is not a version", text));
    }
    if let Some(bad) = text
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+' | '_')))
    {
        return Err(format!("unexpected character '{}' in '{}'", bad, text));
    }
    Version::parse(text).map_err(|e| e.to_string())
}

/// Lower a written comparator into plain comparators.
fn expand(token: Token, version: Version, out: &mut Vec<Comparator>) {
    let precision = version.precision();
    let partial = precision < FULL_PRECISION;
    let last = precision.saturating_sub(1);

    match token {
        Token::Tilde => {
            let upper = version.bump(if precision >= 2 { 1 } else { 0 });
            out.push(Comparator { op: Op::Ge, version });
            out.push(Comparator { op: Op::Lt, version: upper });
        }
        Token::Compatible => {
            let upper = version.bump(last);
            out.push(Comparator { op: Op::Ge, version });
            out.push(Comparator { op: Op::Lt, version: upper });
        }
        Token::Cmp(Op::Eq) if partial => {
            let upper = version.bump(last);
            out.push(Comparator { op: Op::Ge, version });
            out.push(Comparator { op: Op::Lt, version: upper });
        }
        Token::Cmp(Op::Le) if partial => out.push(Comparator {
            op: Op::Lt,
            version: version.bump(last),
        }),
        Token::Cmp(Op::Gt) if partial => out.push(Comparator {
            op: Op::Ge,
            version: version.bump(last),
        }),
        Token::Cmp(op) => out.push(Comparator { op, version }),
    }
}
