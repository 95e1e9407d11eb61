//! The anchor state a log folds its operations onto.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::clock::VectorClock;
use crate::state::Snapshot;

/// The hash of a baseline no operations have ever been folded into.
pub const EMPTY_HASH: [u8; 32] = [0; 32];

/// Extend a baseline hash chain by one operation.
///
/// The chain is `h_i = SHA256(h_{i-1} || uuid_i)` with the UUID as its 16
/// big-endian bytes. Two replicas that fold the same operations in the same
/// order produce the same hash, which is the only cross-replica identity a
/// baseline has.
#[must_use]
pub fn chain(previous: &[u8; 32], id: &Uuid) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(previous);
    hasher.update(id.as_bytes());
    hasher.finalize().into()
}

/// A snapshot plus the identity of the history folded into it.
///
/// A fresh log starts from [`Snapshot::empty`] with the zero hash and no
/// clock; every [`reduce`](crate::OperationLog::reduce_where) produces a new
/// baseline whose clock is the last folded operation's clock.
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline<S, A: Ord> {
    snapshot: S,
    sha256: [u8; 32],
    clock: Option<VectorClock<A>>,
}

impl<S, A: Ord + Clone> Baseline<S, A> {
    /// The baseline of a log with no compacted history.
    pub(crate) fn empty() -> Self
    where
        S: Snapshot,
    {
        Self {
            snapshot: S::empty(),
            sha256: EMPTY_HASH,
            clock: None,
        }
    }

    pub(crate) fn new(snapshot: S, sha256: [u8; 32], clock: Option<VectorClock<A>>) -> Self {
        Self {
            snapshot,
            sha256,
            clock,
        }
    }

    /// The folded state itself.
    #[must_use]
    pub fn snapshot(&self) -> &S {
        &self.snapshot
    }

    /// The hash-chain tag identifying the folded history.
    #[must_use]
    pub fn sha256(&self) -> &[u8; 32] {
        &self.sha256
    }

    /// The clock of the last folded operation, absent for a fresh baseline.
    #[must_use]
    pub fn clock(&self) -> Option<&VectorClock<A>> {
        self.clock.as_ref()
    }
}
