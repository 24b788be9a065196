//! core::reference
//!
//! Identity types for recipes and binary packages.
//!
//! # Types
//!
//! - [`Reference`] - `name/version@user/channel[#revision]`
//! - [`PackageReference`] - `<Reference>:<package_id>[#revision]`
//!
//! # Validation
//!
//! Every identity field is validated at parse time. Invalid values cannot be
//! represented, so the rest of the crate never re-checks them.
//!
//! # Equality
//!
//! Two references are equal iff name, version, user and channel match. The
//! revision only takes part when *both* sides carry one, so an unrevisioned
//! reference matches any revision of the same recipe. Hashing uses the
//! identity fields only, which keeps `Hash` consistent with `Eq`.
//!
//! # Example
//!
//! ```
//! use stowage::core::reference::Reference;
//!
//! let r = Reference::parse("zlib/1.2.11@conan/stable#abc123").unwrap();
//! assert_eq!(r.name(), "zlib");
//! assert_eq!(r.revision(), Some("abc123"));
//! assert_eq!(r.to_string(), "zlib/1.2.11@conan/stable");
//! assert_eq!(r.full_text(), "zlib/1.2.11@conan/stable#abc123");
//!
//! assert_eq!(r, r.without_revision());
//! assert!(Reference::parse("zlib/1.2.11").is_err());
//! ```

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length of a name, version, user or channel field.
pub const MAX_FIELD_LEN: usize = 51;

/// Maximum length of a revision string.
pub const MAX_REVISION_LEN: usize = 64;

/// Errors from reference parsing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReferenceError {
    /// A field failed validation.
    #[error("invalid {field} '{value}': {reason}")]
    Syntax {
        /// The offending field (`name`, `version`, `user`, `channel`, ...)
        field: &'static str,
        /// The rejected value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// The text does not have the `name/version@user/channel` shape.
    #[error("invalid reference '{0}': expected name/version@user/channel[#revision]")]
    Shape(String),

    /// The text does not have the `<reference>:<package_id>` shape.
    #[error("invalid package reference '{0}': expected <reference>:<package_id>[#revision]")]
    PackageShape(String),
}

impl ReferenceError {
    fn syntax(field: &'static str, value: &str, reason: impl Into<String>) -> Self {
        ReferenceError::Syntax {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// The field that failed validation, if the error names one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ReferenceError::Syntax { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Validate a name/version/user/channel field.
pub(crate) fn validate_field(field: &'static str, value: &str) -> Result<(), ReferenceError> {
    if value.is_empty() {
        return Err(ReferenceError::syntax(field, value, "cannot be empty"));
    }
    if value.len() > MAX_FIELD_LEN {
        return Err(ReferenceError::syntax(
            field,
            value,
            format!("longer than {} characters", MAX_FIELD_LEN),
        ));
    }

    let mut chars = value.chars();
    if let Some(first) = chars.next() {
        if !(first.is_ascii_alphanumeric() || first == '_') {
            return Err(ReferenceError::syntax(
                field,
                value,
                "must start with a letter, digit or '_'",
            ));
        }
    }
    if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || "_+.-".contains(*c))) {
        return Err(ReferenceError::syntax(
            field,
            value,
            format!("character '{}' is not allowed", bad),
        ));
    }
    Ok(())
}

fn validate_revision(field: &'static str, value: &str) -> Result<(), ReferenceError> {
    if value.is_empty() {
        return Err(ReferenceError::syntax(field, value, "cannot be empty"));
    }
    if value.len() > MAX_REVISION_LEN {
        return Err(ReferenceError::syntax(
            field,
            value,
            format!("longer than {} characters", MAX_REVISION_LEN),
        ));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ReferenceError::syntax(
            field,
            value,
            "must be alphanumeric",
        ));
    }
    Ok(())
}

/// Split `name/version@user/channel` into its four parts without validating them.
pub(crate) fn split_identity(text: &str) -> Option<(&str, &str, &str, &str)> {
    let (left, right) = text.split_once('@')?;
    let (name, version) = left.split_once('/')?;
    let (user, channel) = right.split_once('/')?;
    Some((name, version, user, channel))
}

/// A recipe reference, optionally pinned to a recipe revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Reference {
    name: String,
    version: String,
    user: String,
    channel: String,
    revision: Option<String>,
}

impl Reference {
    /// Build a reference from already separated fields.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::Syntax`] naming the first invalid field.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        user: impl Into<String>,
        channel: impl Into<String>,
    ) -> Result<Self, ReferenceError> {
        let reference = Self {
            name: name.into(),
            version: version.into(),
            user: user.into(),
            channel: channel.into(),
            revision: None,
        };
        validate_field("name", &reference.name)?;
        validate_field("version", &reference.version)?;
        validate_field("user", &reference.user)?;
        validate_field("channel", &reference.channel)?;
        Ok(reference)
    }

    /// Parse `name/version@user/channel[#revision]`.
    pub fn parse(text: &str) -> Result<Self, ReferenceError> {
        let text = text.trim();
        let (identity, revision) = match text.split_once('#') {
            Some((identity, revision)) => (identity, Some(revision)),
            None => (text, None),
        };

        let (name, version, user, channel) =
            split_identity(identity).ok_or_else(|| ReferenceError::Shape(text.to_string()))?;
        if channel.contains('/') || version.contains('/') {
            return Err(ReferenceError::Shape(text.to_string()));
        }

        let reference = Self::new(name, version, user, channel)?;
        match revision {
            Some(rev) => {
                validate_revision("revision", rev)?;
                Ok(reference.with_revision(rev))
            }
            None => Ok(reference),
        }
    }

    /// Copy of this reference pinned to `revision`.
    pub fn with_revision(&self, revision: impl Into<String>) -> Self {
        Self {
            revision: Some(revision.into()),
            ..self.clone()
        }
    }

    /// Copy of this reference with the revision cleared.
    pub fn without_revision(&self) -> Self {
        Self {
            revision: None,
            ..self.clone()
        }
    }

    /// Copy of this reference under a different `user/channel`.
    pub fn with_user_channel(&self, user: &str, channel: &str) -> Result<Self, ReferenceError> {
        Self::new(&self.name, &self.version, user, channel)
    }

    /// Text form including `#revision` when present.
    pub fn full_text(&self) -> String {
        match &self.revision {
            Some(rev) => format!("{}#{}", self, rev),
            None => self.to_string(),
        }
    }

    /// Revision-aware equality: identity fields plus an exact revision match.
    pub fn eq_with_revision(&self, other: &Reference) -> bool {
        self == other && self.revision == other.revision
    }

    /// Whether `other` names the same package stream (name, user, channel).
    pub fn same_stream(&self, other: &Reference) -> bool {
        self.name == other.name && self.user == other.user && self.channel == other.channel
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    fn identity(&self) -> (&str, &str, &str, &str) {
        (&self.name, &self.version, &self.user, &self.channel)
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        if self.identity() != other.identity() {
            return false;
        }
        match (&self.revision, &other.revision) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

impl Eq for Reference {}

impl Hash for Reference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl PartialOrd for Reference {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Reference {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity()
            .cmp(&other.identity())
            .then_with(|| match (&self.revision, &other.revision) {
                (Some(a), Some(b)) => a.cmp(b),
                _ => Ordering::Equal,
            })
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}@{}/{}",
            self.name, self.version, self.user, self.channel
        )
    }
}

impl std::str::FromStr for Reference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Reference {
    type Error = ReferenceError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Reference> for String {
    fn from(reference: Reference) -> Self {
        reference.full_text()
    }
}

/// A reference to one binary package of a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageReference {
    reference: Reference,
    package_id: String,
    revision: Option<String>,
}

impl PackageReference {
    /// Build a package reference. The package id must be alphanumeric.
    pub fn new(reference: Reference, package_id: impl Into<String>) -> Result<Self, ReferenceError> {
        let package_id = package_id.into();
        if package_id.is_empty() || !package_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ReferenceError::syntax(
                "package_id",
                &package_id,
                "must be a non-empty alphanumeric string",
            ));
        }
        Ok(Self {
            reference,
            package_id,
            revision: None,
        })
    }

    /// Parse `name/version@user/channel[#revision]:package_id[#revision]`.
    pub fn parse(text: &str) -> Result<Self, ReferenceError> {
        let text = text.trim();
        let (recipe_part, package_part) = text
            .split_once(':')
            .ok_or_else(|| ReferenceError::PackageShape(text.to_string()))?;

        let reference = Reference::parse(recipe_part)?;
        let (package_id, revision) = match package_part.split_once('#') {
            Some((id, rev)) => (id, Some(rev)),
            None => (package_part, None),
        };

        let pref = Self::new(reference, package_id)?;
        match revision {
            Some(rev) => {
                validate_revision("package_revision", rev)?;
                Ok(pref.with_revision(rev))
            }
            None => Ok(pref),
        }
    }

    /// Copy pinned to a package revision.
    pub fn with_revision(&self, revision: impl Into<String>) -> Self {
        Self {
            revision: Some(revision.into()),
            ..self.clone()
        }
    }

    /// Full text including both revisions when present.
    pub fn full_text(&self) -> String {
        match &self.revision {
            Some(rev) => format!("{}:{}#{}", self.reference.full_text(), self.package_id, rev),
            None => format!("{}:{}", self.reference.full_text(), self.package_id),
        }
    }

    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    pub fn package_id(&self) -> &str {
        &self.package_id
    }

    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }
}

impl std::fmt::Display for PackageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.reference, self.package_id)
    }
}

impl std::str::FromStr for PackageReference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
