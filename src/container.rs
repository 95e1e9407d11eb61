//! The self-describing serialized form of a log.
//!
//! The container stores the baseline, the *initial* summary (the summary as
//! of the baseline — the live summary is rebuilt by replay on load, which
//! keeps stored logs compact and avoids double-counting across merge round
//! trips), and the operation sequence. Operations must already be strictly
//! ascending under the clock total order; decoders treat anything else as
//! corruption.

use core::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::clock::VectorClock;
use crate::error::{Error, Result};
use crate::op::LoggedOperation;
use crate::summary::Summary;

#[derive(Serialize, Deserialize)]
#[serde(bound(
    serialize = "L: Serialize, A: Serialize, S: Serialize, Op: Serialize",
    deserialize = "L: serde::de::DeserializeOwned, A: serde::de::DeserializeOwned + Ord, \
                   S: serde::de::DeserializeOwned, Op: serde::de::DeserializeOwned"
))]
pub(crate) struct LogContainer<L, A: Ord, S, Op> {
    pub log_id: L,
    pub base_snapshot: S,
    #[serde(default = "zero_hash")]
    pub initial_sha256: [u8; 32],
    #[serde(default)]
    pub initial_clock: Option<VectorClock<A>>,
    pub summary: Summary<A>,
    pub operations: Vec<LoggedOperation<A, Op>>,
}

fn zero_hash() -> [u8; 32] {
    crate::baseline::EMPTY_HASH
}

impl<L, A: Ord, S, Op> LogContainer<L, A, S, Op> {
    /// Enforce the decode precondition: operations strictly ascending under
    /// the total order.
    pub fn validate_sorted(&self) -> Result<()> {
        for pair in self.operations.windows(2) {
            if pair[0].clock().total_order(pair[1].clock()) != Ordering::Less {
                return Err(Error::CorruptLog(format!(
                    "operations out of order at {}",
                    pair[1].id()
                )));
            }
        }
        Ok(())
    }
}
