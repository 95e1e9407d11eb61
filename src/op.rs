//! Operations as they live inside the log.

use core::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::VectorClock;

/// An operation plus the metadata assigned when it entered a log.
///
/// Immutable once constructed. The UUID is random and stable for the
/// operation's lifetime across every replica; the clock fixes the
/// operation's position in the total order.
///
/// Equality and hashing delegate to the clock alone: under the one
/// clock-provider-per-log discipline no two distinct operations can be
/// minted with equal clocks, so clock identity is operation identity. The
/// duplicate suppression in [`OperationLog::insert`](crate::OperationLog::insert)
/// leans on this.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "A: Serialize, Op: Serialize",
    deserialize = "A: serde::de::DeserializeOwned + Ord, Op: serde::de::DeserializeOwned"
))]
pub struct LoggedOperation<A: Ord, Op> {
    id: Uuid,
    actor: A,
    clock: VectorClock<A>,
    operation: Op,
}

impl<A: Ord, Op> LoggedOperation<A, Op> {
    /// Wrap an operation entering the log, assigning it a fresh UUID.
    pub(crate) fn new(actor: A, clock: VectorClock<A>, operation: Op) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor,
            clock,
            operation,
        }
    }

    /// The operation's stable identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The replica that authored the operation.
    #[must_use]
    pub fn actor(&self) -> &A {
        &self.actor
    }

    /// The clock assigned when the operation was appended.
    #[must_use]
    pub fn clock(&self) -> &VectorClock<A> {
        &self.clock
    }

    /// The wrapped user operation.
    #[must_use]
    pub fn operation(&self) -> &Op {
        &self.operation
    }
}

impl<A: Ord, Op> PartialEq for LoggedOperation<A, Op> {
    fn eq(&self, other: &Self) -> bool {
        self.clock == other.clock
    }
}

impl<A: Ord, Op> Eq for LoggedOperation<A, Op> {}

impl<A: Ord + Hash, Op> Hash for LoggedOperation<A, Op> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.clock.hash(state);
    }
}

/// An undo or redo stack entry: the inverse operation together with the id
/// of the logged operation it reverts.
///
/// A reversal is a plain operation, not a [`LoggedOperation`]: it has no
/// clock and no UUID until the moment undo or redo actually appends it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reversal<Op> {
    reverting: Uuid,
    operation: Op,
}

impl<Op> Reversal<Op> {
    pub(crate) fn new(reverting: Uuid, operation: Op) -> Self {
        Self {
            reverting,
            operation,
        }
    }

    /// The id of the logged operation this entry reverts.
    #[must_use]
    pub fn reverting(&self) -> Uuid {
        self.reverting
    }

    /// The inverse operation itself.
    #[must_use]
    pub fn operation(&self) -> &Op {
        &self.operation
    }

    pub(crate) fn into_operation(self) -> Op {
        self.operation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TimestampStrategy;

    fn clock_for(actor: &str) -> VectorClock<String> {
        VectorClock::new(actor.into(), TimestampStrategy::MonotonicIncrease)
            .increment(actor.into())
    }

    #[test]
    fn fresh_operations_get_distinct_ids() {
        let a = LoggedOperation::new("a".to_string(), clock_for("a"), 1u8);
        let b = LoggedOperation::new("a".to_string(), clock_for("a"), 1u8);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn clock_equality_implies_identity() {
        let clock = clock_for("a");
        let a = LoggedOperation::new("a".to_string(), clock.clone(), 1u8);
        let b = LoggedOperation::new("a".to_string(), clock, 2u8);
        // Same clock means equal, regardless of id or payload. The clock
        // provider discipline guarantees this situation never arises for
        // two real mints.
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_clocks_are_unequal() {
        let base: VectorClock<String> =
            VectorClock::new("a".into(), TimestampStrategy::MonotonicIncrease);
        let c1 = base.increment("a".into());
        let c2 = c1.increment("a".into());
        let a = LoggedOperation::new("a".to_string(), c1, 1u8);
        let b = LoggedOperation::new("a".to_string(), c2, 1u8);
        assert_ne!(a, b);
    }
}
