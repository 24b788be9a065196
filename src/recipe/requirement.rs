//! recipe::requirement
//!
//! A dependency declared by a recipe.
//!
//! Text form: `name/version@user/channel[#revision]` for pinned requirements
//! and `name/[expression]@user/channel` for ranges.

use thiserror::Error;

use crate::core::reference::{split_identity, validate_field, Reference, ReferenceError};
use crate::range::{RangeError, VersionRange};

/// Errors from requirement parsing.
#[derive(Debug, Error)]
pub enum RequirementError {
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Range(#[from] RangeError),
}

/// What a requirement points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequirementTarget {
    /// One exact reference.
    Pinned(Reference),
    /// Any version of `name@user/channel` inside `range`.
    Range {
        name: String,
        user: String,
        channel: String,
        range: VersionRange,
    },
}

/// One declared dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    target: RequirementTarget,
    overriding: bool,
    private: bool,
}

impl Requirement {
    pub fn new(target: RequirementTarget) -> Self {
        Self {
            target,
            overriding: false,
            private: false,
        }
    }

    /// Pinned requirement on `reference`.
    pub fn pinned(reference: Reference) -> Self {
        Self::new(RequirementTarget::Pinned(reference))
    }

    /// Parse the text form.
    ///
    /// ```
    /// use stowage::recipe::{Requirement, RequirementTarget};
    ///
    /// let req = Requirement::parse("say/[>0.1,<1]@myuser/testing").unwrap();
    /// assert!(matches!(req.target(), RequirementTarget::Range { .. }));
    /// assert_eq!(req.name(), "say");
    /// ```
    pub fn parse(text: &str) -> Result<Self, RequirementError> {
        let text = text.trim();
        let (name, version, user, channel) = split_identity(text)
            .ok_or_else(|| ReferenceError::Shape(text.to_string()))?;

        let target = match version
            .strip_prefix('[')
            .and_then(|v| v.strip_suffix(']'))
        {
            Some(expression) => {
                validate_field("name", name)?;
                validate_field("user", user)?;
                validate_field("channel", channel)?;
                RequirementTarget::Range {
                    name: name.to_string(),
                    user: user.to_string(),
                    channel: channel.to_string(),
                    range: VersionRange::parse(expression)?,
                }
            }
            None => RequirementTarget::Pinned(Reference::parse(text)?),
        };
        Ok(Self::new(target))
    }

    /// Mark as override: its version wins graph-wide.
    pub fn with_override(mut self, overriding: bool) -> Self {
        self.overriding = overriding;
        self
    }

    /// Mark as private: invisible to conflict checks outside its subtree.
    pub fn with_private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    pub fn target(&self) -> &RequirementTarget {
        &self.target
    }

    /// Package name targeted.
    pub fn name(&self) -> &str {
        match &self.target {
            RequirementTarget::Pinned(reference) => reference.name(),
            RequirementTarget::Range { name, .. } => name,
        }
    }

    /// User and channel targeted.
    pub fn user_channel(&self) -> (&str, &str) {
        match &self.target {
            RequirementTarget::Pinned(reference) => (reference.user(), reference.channel()),
            RequirementTarget::Range { user, channel, .. } => (user, channel),
        }
    }

    pub fn is_override(&self) -> bool {
        self.overriding
    }

    pub fn is_private(&self) -> bool {
        self.private
    }

    /// Copy of this requirement pinned to `reference`, keeping its flags.
    pub fn retarget(&self, reference: Reference) -> Self {
        Self {
            target: RequirementTarget::Pinned(reference),
            overriding: self.overriding,
            private: self.private,
        }
    }
}

impl std::fmt::Display for Requirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.target {
            RequirementTarget::Pinned(reference) => write!(f, "{}", reference.full_text()),
            RequirementTarget::Range {
                name,
                user,
                channel,
                range,
            } => write!(f, "{}/[{}]@{}/{}", name, range, user, channel),
        }
    }
}

impl std::str::FromStr for Requirement {
    type Err = RequirementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
