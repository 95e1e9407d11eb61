//! # oplog-kit
//!
//! A convergent, totally-ordered operation log for local-first applications.
//!
//! An [`OperationLog`] records operations authored by multiple independent
//! actors and folds them over a baseline snapshot. Replicas of the same
//! logical log append locally, diverge freely, and merge deterministically:
//! after any two replicas have merged each other they hold identical
//! operation sequences and identical snapshots, without coordination — the
//! log is a CRDT over operation sequences.
//!
//! Ordering comes from vector clocks: the causal partial order is extended
//! to a deterministic total order (timestamp, then actor, then counters), so
//! every replica sorts the same operations the same way. Compacted history
//! is identified by a SHA-256 hash chain over operation UUIDs, which lets
//! two differently-truncated replicas recognize a shared baseline.
//!
//! ## Quick Start
//!
//! ```
//! use oplog_kit::prelude::*;
//!
//! let mut alice = OperationLog::<String, String, TextState>::with_strategy(
//!     "shared-doc".into(),
//!     "alice".into(),
//!     TimestampStrategy::MonotonicIncrease,
//! );
//! alice.append(TextOp::Append('h'));
//! alice.append(TextOp::Append('i'));
//!
//! // A second replica of the same log, writing as a different actor.
//! let mut bob = alice.fork("bob".to_string());
//! bob.append(TextOp::Append('!'));
//! alice.append(TextOp::Append('?'));
//!
//! // Merging in both directions converges both replicas.
//! alice.merge(&bob).unwrap();
//! bob.merge(&alice).unwrap();
//! assert_eq!(alice.snapshot().as_str(), bob.snapshot().as_str());
//! ```
//!
//! ## Pieces
//!
//! - [`VectorClock`] / [`ClockProvider`] — causal ordering and its
//!   deterministic linearization.
//! - [`Snapshot`] and [`Operation`] — the two interfaces user state
//!   implements; [`Outcome`] reports how each apply went and supplies the
//!   inverse operation the undo system uses.
//! - [`OperationLog`] — append, insert, merge, undo/redo, reduce
//!   (compaction), and serialization.
//! - [`Summary`] — accumulated metadata: actors seen, per-operation apply
//!   records, the join of all clocks.
//! - [`TextState`] — a small reference state type used by the docs and
//!   tests.
//!
//! ## Undo and redo
//!
//! Undo does not rewrite history. Reverting an operation appends the inverse
//! operation as a brand-new log entry with its own clock, so remote replicas
//! simply see another operation. The undo/redo stacks are derived state and
//! are rebuilt whenever remote operations force a replay.
//!
//! ## Compaction
//!
//! [`reduce`](OperationLog::reduce_where) folds a prefix of the log into a
//! new baseline identified by a hash chain. Replicas that compacted to the
//! same point keep merging as if nothing happened; a replica that lags
//! behind a peer's baseline re-aligns during [`merge`](OperationLog::merge).

#![warn(missing_docs)]

pub mod clock;
pub mod prelude;

mod baseline;
mod container;
mod envelope;
mod error;
mod log;
mod op;
mod state;
mod summary;
mod text;

pub use baseline::{chain, Baseline, EMPTY_HASH};
pub use clock::{CausalOrder, ClockProvider, TimestampStrategy, VectorClock};
pub use envelope::{CURRENT_VERSION, ENVELOPE_HEADER_SIZE, MAGIC_BYTE};
pub use error::{Error, Result};
pub use log::OperationLog;
pub use op::{LoggedOperation, Reversal};
pub use state::{ApplyKind, Ident, Operation, Outcome, Snapshot};
pub use summary::{AppliedOperation, Summary};
pub use text::{TextOp, TextState};
