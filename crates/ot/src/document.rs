//! Document state owned by the embedding session.
//!
//! `DocumentState` is a snapshot the engine mutates in place: content,
//! version counter, and causal bookkeeping. One state per document, owned
//! exclusively by the session that embeds the engine; the engine never
//! persists it.

use crate::chordpro;
use crate::clock::VectorClock;
use crate::error::OtResult;
use crate::op_id::UserId;
use crate::operation::{EditOp, OrderedOperation};
use crate::transform;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mutable per-document state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentState {
    /// Current document content.
    pub content: String,
    /// Count of operations applied since creation.
    pub version: u64,
    /// When the last operation was applied.
    pub last_modified: DateTime<Utc>,
    /// Who produced the last applied operation.
    pub last_modified_by: UserId,
    /// Everything this replica has seen.
    pub clock: VectorClock,
}

impl DocumentState {
    /// Create a fresh document owned by `owner`.
    pub fn new(content: impl Into<String>, owner: UserId) -> Self {
        Self {
            content: content.into(),
            version: 0,
            last_modified: Utc::now(),
            last_modified_by: owner,
            clock: VectorClock::new(),
        }
    }

    /// Stamp a local edit: increment this user's clock entry and wrap the
    /// edit in an `OrderedOperation` carrying a snapshot of the clock.
    pub fn stamp_local(&mut self, op: impl Into<EditOp>, user_id: &UserId) -> OrderedOperation {
        self.clock.increment(user_id);
        OrderedOperation::new(op, self.clock.clone(), user_id.clone())
    }

    /// Apply an ordered operation to this document.
    ///
    /// Text operations are total; ChordPro modify/delete can fail when the
    /// target span no longer exists, in which case the state is untouched
    /// and the caller hands the failure to the recovery manager.
    pub fn apply_operation(&mut self, op: &OrderedOperation) -> OtResult<()> {
        let next = match &op.op {
            EditOp::Text(text_op) => transform::apply(&self.content, text_op),
            EditOp::ChordPro(chord_op) => {
                chordpro::apply_chordpro_operation(&self.content, chord_op)?
            }
        };

        self.content = next;
        self.version += 1;
        self.clock.merge(&op.clock);
        self.last_modified = Utc::now();
        self.last_modified_by = op.user_id.clone();
        Ok(())
    }
}
