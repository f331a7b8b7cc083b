//! Error types for the transformation engine.

use crate::op_id::{OperationId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for engine operations.
pub type OtResult<T> = Result<T, EngineError>;

/// Errors that can occur while applying or recovering operations.
///
/// The transform algebra itself is total over well-typed input (out-of-range
/// positions are clamped, see `transform`); these errors cover the cases
/// where an operation genuinely cannot be honored.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineError {
    /// A ChordPro modify/delete found no bracketed or braced span at its anchor.
    #[error("no chord or directive span containing position {0}")]
    SpanNotFound(usize),

    /// Operation depends on state the receiver has not seen yet.
    #[error("causal dependency not satisfied for operation {op}: missing seq {missing} from {user}")]
    CausalityGap {
        op: OperationId,
        user: UserId,
        missing: u64,
    },

    /// Rollback was requested but no checkpoint is available.
    #[error("no checkpoint available to roll back to")]
    NoCheckpoint,

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}
