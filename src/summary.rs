//! Accumulated metadata about the operations a log has applied.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::{TimestampStrategy, VectorClock};
use crate::op::LoggedOperation;
use crate::state::ApplyKind;

/// What happened to one operation when the log applied it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "A: Serialize",
    deserialize = "A: serde::de::DeserializeOwned"
))]
pub struct AppliedOperation<A> {
    /// The operation's stable identifier.
    pub id: Uuid,
    /// Position of the operation in the log's lifetime apply sequence,
    /// counting operations folded into the baseline.
    pub index: u64,
    /// The replica that authored the operation.
    pub actor: A,
    /// How the snapshot absorbed the operation.
    pub apply: ApplyKind,
}

/// Rolling metadata across every operation a log has seen.
///
/// A log keeps two summaries: the one frozen at the baseline (persisted in
/// the serialized container) and the live one, which is always the frozen
/// summary plus one record per current operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "A: Serialize",
    deserialize = "A: serde::de::DeserializeOwned + Ord"
))]
pub struct Summary<A: Ord> {
    actors: BTreeSet<A>,
    latest_clock: VectorClock<A>,
    operation_count: u64,
    infos: Vec<AppliedOperation<A>>,
}

impl<A: Ord + Clone> Summary<A> {
    /// Summary of a fresh, empty log owned by `actor`.
    pub(crate) fn new(actor: A, strategy: TimestampStrategy) -> Self {
        let latest_clock = VectorClock::new(actor.clone(), strategy);
        let mut actors = BTreeSet::new();
        actors.insert(actor);
        Self {
            actors,
            latest_clock,
            operation_count: 0,
            infos: Vec::new(),
        }
    }

    /// Record one applied operation.
    pub(crate) fn record<Op>(&mut self, logged: &LoggedOperation<A, Op>, apply: ApplyKind) {
        self.actors.insert(logged.actor().clone());
        self.latest_clock = self.latest_clock.merge(logged.clock());
        self.infos.push(AppliedOperation {
            id: logged.id(),
            index: self.operation_count,
            actor: logged.actor().clone(),
            apply,
        });
        self.operation_count += 1;
    }

    /// Every actor whose operations this log has seen.
    #[must_use]
    pub fn actors(&self) -> &BTreeSet<A> {
        &self.actors
    }

    /// The join of all recorded operation clocks.
    #[must_use]
    pub fn latest_clock(&self) -> &VectorClock<A> {
        &self.latest_clock
    }

    /// Total operations recorded, including those folded into the baseline.
    #[must_use]
    pub fn operation_count(&self) -> u64 {
        self.operation_count
    }

    /// Per-operation apply records, oldest first.
    #[must_use]
    pub fn infos(&self) -> &[AppliedOperation<A>] {
        &self.infos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ClockProvider;

    #[test]
    fn record_tracks_actors_count_and_clock() {
        let mut summary = Summary::new("a".to_string(), TimestampStrategy::MonotonicIncrease);
        let mut alice = ClockProvider::new("a".to_string(), TimestampStrategy::MonotonicIncrease);
        let mut bob = ClockProvider::new("b".to_string(), TimestampStrategy::MonotonicIncrease);

        let first = LoggedOperation::new("a".to_string(), alice.next(), 10u8);
        let second = LoggedOperation::new("b".to_string(), bob.next(), 20u8);

        summary.record(&first, ApplyKind::Full);
        summary.record(
            &second,
            ApplyKind::Skipped {
                reason: "noop".into(),
            },
        );

        assert_eq!(summary.operation_count(), 2);
        assert!(summary.actors().contains("a"));
        assert!(summary.actors().contains("b"));
        assert_eq!(summary.latest_clock().get(&"a".into()), 1);
        assert_eq!(summary.latest_clock().get(&"b".into()), 1);

        let infos = summary.infos();
        assert_eq!(infos[0].index, 0);
        assert_eq!(infos[1].index, 1);
        assert_eq!(infos[0].id, first.id());
        assert!(matches!(infos[1].apply, ApplyKind::Skipped { .. }));
    }
}
