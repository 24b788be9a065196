//! engine::decision
//!
//! Audit log of the choices made while building a graph.
//!
//! Every entry names the requirer (`root` for top-level requirements) and
//! the references involved, so a reader can replay why each node ended up
//! at its version.

use crate::core::reference::Reference;

/// One recorded choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// A new node was created for `reference`.
    Resolved {
        requirer: String,
        requirement: String,
        reference: Reference,
    },
    /// The requirement was satisfied by an existing node.
    Unified {
        requirer: String,
        reference: Reference,
    },
    /// A range was checked against an existing node and accepted.
    RangeValid {
        requirer: String,
        range: String,
        reference: Reference,
    },
    /// A range was checked against an existing node and rejected.
    RangeInvalid {
        requirer: String,
        range: String,
        existing: Reference,
    },
    /// An override replaced what the requirer asked for.
    Overridden {
        requirer: String,
        requested: String,
        winner: Reference,
    },
    /// The requirement conflicted with an existing node.
    ConflictRejected {
        requirer: String,
        requested: String,
        existing: Reference,
    },
}

impl Decision {
    /// Whether this entry records an override application.
    pub fn is_override(&self) -> bool {
        matches!(self, Decision::Overridden { .. })
    }

    /// The requirer this entry is about.
    pub fn requirer(&self) -> &str {
        match self {
            Decision::Resolved { requirer, .. }
            | Decision::Unified { requirer, .. }
            | Decision::RangeValid { requirer, .. }
            | Decision::RangeInvalid { requirer, .. }
            | Decision::Overridden { requirer, .. }
            | Decision::ConflictRejected { requirer, .. } => requirer,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Resolved {
                requirer,
                requirement,
                reference,
            } => write!(f, "{}: {} resolved to {}", requirer, requirement, reference),
            Decision::Unified {
                requirer,
                reference,
            } => write!(f, "{}: shares existing {}", requirer, reference),
            Decision::RangeValid {
                requirer,
                range,
                reference,
            } => write!(f, "{}: range {} valid for {}", requirer, range, reference),
            Decision::RangeInvalid {
                requirer,
                range,
                existing,
            } => write!(f, "{}: range {} not satisfied by {}", requirer, range, existing),
            Decision::Overridden {
                requirer,
                requested,
                winner,
            } => write!(f, "{}: {} overridden to {}", requirer, requested, winner),
            Decision::ConflictRejected {
                requirer,
                requested,
                existing,
            } => write!(f, "{}: {} conflicts with {}", requirer, requested, existing),
        }
    }
}
