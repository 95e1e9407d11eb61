//! Error reporting.

use thiserror::Error;

/// Everything that can go wrong operating on a log.
///
/// A failed mutation leaves the log exactly as it was; no error is retried
/// or suppressed internally.
#[derive(Debug, Error)]
pub enum Error {
    /// Tried to merge logs with different log ids.
    #[error("cannot merge logs with different log ids")]
    LogIdMismatch,

    /// Incoming operations fall at or below the local baseline: their
    /// history has been compacted away here, or the baselines cannot be
    /// reconciled.
    #[error("incoming operations predate this log's baseline")]
    MergeNotPossible,

    /// The reduce cutoff was never satisfied.
    #[error("reduce cutoff matched no operation")]
    ReduceNotPossible,

    /// Malformed container bytes, or decoded operations violating the
    /// total-order sortedness precondition.
    #[error("corrupt log container: {0}")]
    CorruptLog(String),

    /// A user snapshot or operation failed to serialize or deserialize.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
