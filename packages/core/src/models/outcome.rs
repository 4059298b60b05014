//! Mutation outcomes
//!
//! Update, delete and move report recoverable conditions as values rather
//! than errors, so callers can re-read and retry. Storage failures never
//! appear here; they surface as `Err(StoreError)`.

use serde::Serialize;
use std::fmt;

/// Result of a concurrency-checked or structural mutation.
///
/// `is_applied()` is the boolean view: `true` iff the row was changed.
/// The other variants tell apart the reasons a mutation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationOutcome {
    /// Exactly one row was changed and the transaction committed
    Applied,

    /// No node with the requested ID exists
    NotFound,

    /// The stored `ParentID`, `Status` or `Importance` no longer matches the
    /// caller's snapshot
    PreconditionFailed,

    /// The move would place a node under itself or one of its descendants
    WouldCreateCycle,

    /// The node still has children and the store refuses to orphan them
    HasChildren,
}

impl MutationOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, MutationOutcome::Applied)
    }
}

impl From<MutationOutcome> for bool {
    fn from(outcome: MutationOutcome) -> Self {
        outcome.is_applied()
    }
}

impl fmt::Display for MutationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MutationOutcome::Applied => "applied",
            MutationOutcome::NotFound => "node not found",
            MutationOutcome::PreconditionFailed => "concurrency precondition failed",
            MutationOutcome::WouldCreateCycle => "move would create a cycle",
            MutationOutcome::HasChildren => "node has children",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_applied_is_true() {
        assert!(MutationOutcome::Applied.is_applied());
        assert!(!bool::from(MutationOutcome::NotFound));
        assert!(!bool::from(MutationOutcome::PreconditionFailed));
        assert!(!MutationOutcome::WouldCreateCycle.is_applied());
        assert!(!MutationOutcome::HasChildren.is_applied());
    }
}
