//! Convenient re-exports for common usage.
//!
//! ```
//! use oplog_kit::prelude::*;
//! ```

pub use crate::clock::{CausalOrder, ClockProvider, TimestampStrategy, VectorClock};
pub use crate::error::{Error, Result};
pub use crate::log::OperationLog;
pub use crate::op::LoggedOperation;
pub use crate::state::{ApplyKind, Operation, Outcome, Snapshot};
pub use crate::summary::{AppliedOperation, Summary};
pub use crate::text::{TextOp, TextState};
