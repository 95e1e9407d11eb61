//! Vector clocks and the per-replica clock provider.
//!
//! A [`VectorClock`] carries a counter per actor plus a scalar timestamp used
//! to linearize concurrent updates. The partial order over clocks captures
//! causality; the total order extends it deterministically so that every
//! replica sorts the same set of operations into the same sequence.
//!
//! # Example
//!
//! ```
//! use oplog_kit::clock::{TimestampStrategy, VectorClock};
//!
//! let base: VectorClock<String> =
//!     VectorClock::new("a".into(), TimestampStrategy::MonotonicIncrease);
//! let a1 = base.increment("a".into());
//! let b1 = base.increment("b".into());
//!
//! // a1 and b1 are concurrent, but the total order still ranks them.
//! assert_ne!(a1.total_order(&b1), std::cmp::Ordering::Equal);
//!
//! let joined = a1.merge(&b1);
//! assert_eq!(joined.get(&"a".into()), 1);
//! assert_eq!(joined.get(&"b".into()), 1);
//! ```

use core::cmp::Ordering;
use core::hash::{Hash, Hasher};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use serde::{Deserialize, Serialize};

/// Process-global counter backing [`TimestampStrategy::MonotonicIncrease`].
static MONOTONIC: AtomicU64 = AtomicU64::new(1);

/// How a clock samples its scalar timestamp on each tick.
///
/// The strategy is fixed when the first clock of a log is created and is
/// carried through every derived clock, so all replicas of one log stamp
/// their ticks the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimestampStrategy {
    /// Always 0. Ties resolve purely by actor and counters.
    Constant,
    /// Wall-clock seconds since the Unix epoch at tick time.
    UnixTime,
    /// A process-global counter incremented on each call. Deterministic,
    /// which makes it the strategy of choice for tests.
    MonotonicIncrease,
}

impl TimestampStrategy {
    /// Sample a fresh timestamp for a tick.
    pub(crate) fn sample(self) -> f64 {
        match self {
            Self::Constant => 0.0,
            Self::UnixTime => std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs_f64(),
            Self::MonotonicIncrease => MONOTONIC.fetch_add(1, AtomicOrdering::SeqCst) as f64,
        }
    }
}

/// Causal relationship between two vector clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CausalOrder {
    /// All counters agree.
    Equal,
    /// Every counter of `self` is ≤ the other's, with at least one strictly
    /// smaller: `self` happened before.
    Ascending,
    /// The symmetric case: `self` happened after.
    Descending,
    /// Neither dominates: the clocks belong to concurrent updates.
    Concurrent,
}

/// An immutable vector clock.
///
/// Counters map actors to the number of ticks observed from them; a missing
/// actor reads as 0. Alongside the counters the clock records which actor
/// produced the latest tick and the timestamp that tick sampled, which the
/// total order uses to break ties between concurrent clocks.
///
/// All operations return new values; a clock is never mutated in place.
///
/// Equality and hashing consider only the non-zero counter entries, so two
/// clocks describing the same causal history compare equal regardless of
/// which replica's tick produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "A: Serialize",
    deserialize = "A: serde::de::DeserializeOwned + Ord"
))]
pub struct VectorClock<A: Ord> {
    /// Ticks observed per actor. Serialized as an entry sequence because
    /// JSON cannot key objects by non-string actor types.
    #[serde(with = "counter_entries")]
    counters: BTreeMap<A, u64>,
    last_actor: A,
    timestamp: f64,
    strategy: TimestampStrategy,
}

impl<A: Ord + Clone> VectorClock<A> {
    /// Create an empty clock (all counters zero) owned by `actor`.
    pub fn new(actor: A, strategy: TimestampStrategy) -> Self {
        Self {
            counters: BTreeMap::new(),
            last_actor: actor,
            timestamp: 0.0,
            strategy,
        }
    }

    /// Return a new clock with `actor`'s counter advanced by one and a
    /// freshly sampled timestamp.
    #[must_use]
    pub fn increment(&self, actor: A) -> Self {
        let mut counters = self.counters.clone();
        *counters.entry(actor.clone()).or_insert(0) += 1;
        Self {
            counters,
            last_actor: actor,
            timestamp: self.strategy.sample(),
            strategy: self.strategy,
        }
    }

    /// Join two clocks: pointwise max over counters.
    ///
    /// The timestamp and last-actor are taken from whichever side carries the
    /// strictly greater timestamp; on a timestamp tie the greater actor wins,
    /// so the merge commutes.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut counters = self.counters.clone();
        for (actor, &count) in &other.counters {
            let entry = counters.entry(actor.clone()).or_insert(0);
            *entry = (*entry).max(count);
        }

        let (timestamp, last_actor) = match self.timestamp.total_cmp(&other.timestamp) {
            Ordering::Greater => (self.timestamp, self.last_actor.clone()),
            Ordering::Less => (other.timestamp, other.last_actor.clone()),
            Ordering::Equal => (
                self.timestamp,
                self.last_actor.clone().max(other.last_actor.clone()),
            ),
        };

        Self {
            counters,
            last_actor,
            timestamp,
            strategy: self.strategy,
        }
    }
}

impl<A: Ord> VectorClock<A> {
    /// Read an actor's counter; missing actors read as 0.
    #[must_use]
    pub fn get(&self, actor: &A) -> u64 {
        self.counters.get(actor).copied().unwrap_or(0)
    }

    /// The actor that produced the most recent tick.
    #[must_use]
    pub fn last_actor(&self) -> &A {
        &self.last_actor
    }

    /// The timestamp sampled by the most recent tick.
    #[must_use]
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// The timestamp strategy this clock was created with.
    #[must_use]
    pub fn strategy(&self) -> TimestampStrategy {
        self.strategy
    }

    /// Causal comparison of two clocks.
    #[must_use]
    pub fn partial_order(&self, other: &Self) -> CausalOrder {
        let mut ascending = true; // self <= other everywhere
        let mut descending = true; // self >= other everywhere

        for (actor, &count) in &self.counters {
            let theirs = other.get(actor);
            if count > theirs {
                ascending = false;
            }
            if count < theirs {
                descending = false;
            }
        }
        for (actor, &count) in &other.counters {
            let ours = self.get(actor);
            if ours > count {
                ascending = false;
            }
            if ours < count {
                descending = false;
            }
        }

        match (ascending, descending) {
            (true, true) => CausalOrder::Equal,
            (true, false) => CausalOrder::Ascending,
            (false, true) => CausalOrder::Descending,
            (false, false) => CausalOrder::Concurrent,
        }
    }

    /// Deterministic linearization of the causal order.
    ///
    /// Causally related clocks keep their causal order. Concurrent clocks are
    /// ranked by timestamp, then by last actor, then by the sorted
    /// `(actor, counter)` vector, so the relation is total and every replica
    /// agrees on it.
    #[must_use]
    pub fn total_order(&self, other: &Self) -> Ordering {
        match self.partial_order(other) {
            CausalOrder::Ascending => return Ordering::Less,
            CausalOrder::Descending => return Ordering::Greater,
            CausalOrder::Equal | CausalOrder::Concurrent => {}
        }

        match self.timestamp.total_cmp(&other.timestamp) {
            Ordering::Equal => {}
            unequal => return unequal,
        }

        match self.last_actor.cmp(&other.last_actor) {
            Ordering::Equal => {}
            unequal => return unequal,
        }

        self.nonzero_entries().cmp(other.nonzero_entries())
    }

    fn nonzero_entries(&self) -> impl Iterator<Item = (&A, &u64)> {
        self.counters.iter().filter(|(_, &count)| count != 0)
    }
}

impl<A: Ord> PartialEq for VectorClock<A> {
    fn eq(&self, other: &Self) -> bool {
        self.nonzero_entries().eq(other.nonzero_entries())
    }
}

impl<A: Ord> Eq for VectorClock<A> {}

impl<A: Ord + Hash> Hash for VectorClock<A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for (actor, count) in self.nonzero_entries() {
            actor.hash(state);
            count.hash(state);
        }
    }
}

/// Stateful mint of successive clocks for a single actor.
///
/// Each log owns exactly one provider. [`next`](ClockProvider::next) always
/// returns a clock strictly greater than everything the provider has issued
/// or observed, which is what keeps a log's local appends at the top of the
/// total order.
#[derive(Debug, Clone)]
pub struct ClockProvider<A: Ord> {
    actor: A,
    current: VectorClock<A>,
}

impl<A: Ord + Clone> ClockProvider<A> {
    /// Create a provider starting from an empty clock.
    pub fn new(actor: A, strategy: TimestampStrategy) -> Self {
        let current = VectorClock::new(actor.clone(), strategy);
        Self { actor, current }
    }

    /// Create a provider resuming from a previously issued or received clock.
    pub fn seeded(actor: A, clock: VectorClock<A>) -> Self {
        Self {
            actor,
            current: clock,
        }
    }

    /// Mint the next clock for this provider's actor.
    pub fn next(&mut self) -> VectorClock<A> {
        self.current = self.current.increment(self.actor.clone());
        self.current.clone()
    }

    /// Absorb a remote clock so future mints dominate it.
    pub fn observe(&mut self, remote: &VectorClock<A>) {
        self.current = self.current.merge(remote);
    }

    /// The most recent clock issued or observed.
    #[must_use]
    pub fn current(&self) -> &VectorClock<A> {
        &self.current
    }

    /// The actor this provider mints for.
    #[must_use]
    pub fn actor(&self) -> &A {
        &self.actor
    }
}

mod counter_entries {
    use std::collections::BTreeMap;

    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<A, S>(map: &BTreeMap<A, u64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        A: Serialize,
        S: Serializer,
    {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, A, D>(deserializer: D) -> Result<BTreeMap<A, u64>, D::Error>
    where
        A: DeserializeOwned + Ord,
        D: Deserializer<'de>,
    {
        let entries: Vec<(A, u64)> = Vec::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}
