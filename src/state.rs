//! The interfaces user-supplied operation and snapshot types implement.
//!
//! The log itself never interprets operations. It hands each one to the
//! snapshot's [`apply`](Snapshot::apply) and records the reported
//! [`Outcome`], which is also where the undo system gets its inverse
//! operations from.

use core::fmt;
use core::hash::Hash;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Bound alias for actor and log identifiers.
///
/// Anything totally orderable, hashable, and serializable can identify a
/// replica or a log: strings, integers, UUIDs.
pub trait Ident: Clone + Ord + Hash + fmt::Debug + Serialize + DeserializeOwned {}

impl<T: Clone + Ord + Hash + fmt::Debug + Serialize + DeserializeOwned> Ident for T {}

/// A single user-level operation recorded in the log.
///
/// Operations are values: no method mutates `self`, and an operation must
/// serialize to the same bytes on every replica.
pub trait Operation: Clone + Eq + Hash + fmt::Debug + Serialize + DeserializeOwned {
    /// Optional human-readable description, used for diagnostics only.
    fn describe(&self) -> Option<String> {
        None
    }
}

/// The state a log folds its operations onto.
///
/// # Contract
///
/// `apply` must be a pure function of `(self, op)`: no side effects, no
/// hidden inputs, identical results on every replica. For the non-skipped
/// outcomes the returned undo operation must, when applied to the post
/// state, reproduce a snapshot equal to the pre state. The undo stack and
/// the whole recompute-on-merge machinery rely on both properties.
pub trait Snapshot: Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned {
    /// The operation type this snapshot understands.
    type Op: Operation;

    /// The canonical state of a freshly created log.
    fn empty() -> Self;

    /// Apply one operation, returning the successor state and what happened.
    fn apply(&self, op: &Self::Op) -> (Self, Outcome<Self::Op>);
}

/// What happened when a snapshot applied an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<Op> {
    /// The operation applied cleanly; `undo` reverts it.
    Full {
        /// Inverse operation restoring the pre-apply state.
        undo: Op,
    },
    /// The operation applied with a caveat; `undo` still reverts it.
    Partial {
        /// Inverse operation restoring the pre-apply state.
        undo: Op,
        /// Why the application was only partial.
        reason: String,
    },
    /// The operation had no effect and produces no undo entry.
    Skipped {
        /// Why the operation was skipped.
        reason: String,
    },
}

impl<Op> Outcome<Op> {
    /// The undo operation, unless the application was skipped.
    pub fn into_undo(self) -> Option<Op> {
        match self {
            Self::Full { undo } | Self::Partial { undo, .. } => Some(undo),
            Self::Skipped { .. } => None,
        }
    }

    /// Whether the operation affected the snapshot at all.
    #[must_use]
    pub fn applied(&self) -> bool {
        !matches!(self, Self::Skipped { .. })
    }
}

/// The outcome of an application, minus the undo payload.
///
/// This is what the [`Summary`](crate::Summary) keeps per operation and what
/// the serialized container stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApplyKind {
    /// Applied cleanly.
    Full,
    /// Applied with a caveat.
    Partial {
        /// Why the application was only partial.
        reason: String,
    },
    /// Had no effect.
    Skipped {
        /// Why the operation was skipped.
        reason: String,
    },
}

impl<Op> From<&Outcome<Op>> for ApplyKind {
    fn from(outcome: &Outcome<Op>) -> Self {
        match outcome {
            Outcome::Full { .. } => Self::Full,
            Outcome::Partial { reason, .. } => Self::Partial {
                reason: reason.clone(),
            },
            Outcome::Skipped { reason } => Self::Skipped {
                reason: reason.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_undo_drops_skipped() {
        let full: Outcome<u8> = Outcome::Full { undo: 1 };
        let skipped: Outcome<u8> = Outcome::Skipped {
            reason: "nothing to do".into(),
        };
        assert_eq!(full.into_undo(), Some(1));
        assert_eq!(skipped.into_undo(), None);
    }

    #[test]
    fn apply_kind_preserves_reasons() {
        let partial: Outcome<u8> = Outcome::Partial {
            undo: 2,
            reason: "clamped".into(),
        };
        assert_eq!(
            ApplyKind::from(&partial),
            ApplyKind::Partial {
                reason: "clamped".into()
            }
        );
    }
}
