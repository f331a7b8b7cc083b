//! Checkpointing and failure recovery.
//!
//! The checkpoint manager keeps a FIFO-bounded list of immutable document
//! snapshots. When an operation cannot be applied, `attempt_recovery`
//! selects a strategy in fixed priority order: retry while attempts remain,
//! skip when the operation is recoverable but retries are exhausted, roll
//! back to the latest checkpoint and replay, and finally manual resolution
//! when nothing else applies.

use crate::chordpro;
use crate::clock::{self, VectorClock};
use crate::error::{EngineError, OtResult};
use crate::op_id::OperationId;
use crate::operation::{ChordProOp, EditOp, OrderedOperation, TextOp};
use crate::transform;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Bounded retry attempts before a recoverable failure is skipped.
pub const MAX_RETRIES: u32 = 3;

/// Default number of retained checkpoints.
pub const DEFAULT_MAX_CHECKPOINTS: usize = 20;

/// An immutable snapshot of document state, used as a rollback point.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentCheckpoint {
    /// Unique checkpoint id.
    pub id: String,
    /// Full content at snapshot time.
    pub content: String,
    /// Document version at snapshot time.
    pub version: u64,
    /// Causal state at snapshot time.
    pub clock: VectorClock,
    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
    /// The last operation covered by this snapshot, if any.
    pub operation_id: Option<OperationId>,
}

/// FIFO-bounded list of checkpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckpointManager {
    checkpoints: VecDeque<DocumentCheckpoint>,
    max_checkpoints: usize,
}

impl Default for CheckpointManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHECKPOINTS)
    }
}

impl CheckpointManager {
    /// Create a manager retaining at most `max_checkpoints` snapshots.
    pub fn new(max_checkpoints: usize) -> Self {
        Self {
            checkpoints: VecDeque::new(),
            max_checkpoints: max_checkpoints.max(1),
        }
    }

    /// Store a new snapshot, evicting the oldest when over the bound.
    pub fn create_checkpoint(
        &mut self,
        content: &str,
        version: u64,
        clock: VectorClock,
        operation_id: Option<OperationId>,
    ) -> &DocumentCheckpoint {
        let checkpoint = DocumentCheckpoint {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.to_string(),
            version,
            clock,
            timestamp: Utc::now(),
            operation_id,
        };

        self.checkpoints.push_back(checkpoint);
        while self.checkpoints.len() > self.max_checkpoints {
            if let Some(evicted) = self.checkpoints.pop_front() {
                tracing::debug!(checkpoint = %evicted.id, version = evicted.version, "pruned oldest checkpoint");
            }
        }
        self.checkpoints.back().unwrap()
    }

    /// The most recent checkpoint, if any.
    pub fn latest(&self) -> Option<&DocumentCheckpoint> {
        self.checkpoints.back()
    }

    /// Iterate over retained checkpoints, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &DocumentCheckpoint> {
        self.checkpoints.iter()
    }

    /// Number of retained checkpoints.
    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    /// Check if no checkpoints are retained.
    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    /// Serialize to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Record of an operation the session failed to apply.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OperationFailure {
    /// The operation that failed.
    pub operation_id: OperationId,
    /// Why it failed.
    pub error: EngineError,
    /// When the failure was recorded.
    pub timestamp: DateTime<Utc>,
    /// Attempts so far.
    pub retry_count: u32,
    /// Whether skipping or retrying this operation is acceptable.
    pub can_recover: bool,
}

impl OperationFailure {
    /// Record a fresh failure.
    pub fn new(operation_id: OperationId, error: EngineError, can_recover: bool) -> Self {
        Self {
            operation_id,
            error,
            timestamp: Utc::now(),
            retry_count: 0,
            can_recover,
        }
    }

    /// Count another attempt.
    pub fn bump_retry(&mut self) {
        self.retry_count += 1;
    }
}

/// Strategy chosen by `attempt_recovery`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryStrategy {
    /// Attempts remain; the caller should retry the operation.
    Retry,
    /// Retries exhausted but the operation is safe to discard.
    Skip,
    /// Replayed onto the latest checkpoint.
    Rollback,
    /// Nothing applied; the caller must surface a user-facing conflict.
    Manual,
}

/// Outcome of a recovery attempt.
#[derive(Clone, Debug)]
pub struct RecoveryOutcome {
    pub strategy: RecoveryStrategy,
    /// Whether the failure is now resolved.
    pub recovered: bool,
    /// Replayed content, present only for a successful rollback.
    pub content: Option<String>,
}

/// Select and execute a recovery strategy for a failed operation.
///
/// Strategies are tried in fixed order: retry while `retry_count` is under
/// `MAX_RETRIES` and the failure is recoverable; skip once retries are
/// exhausted; roll back to the latest checkpoint and replay every later
/// operation except the failed one; otherwise escalate to manual.
pub fn attempt_recovery(
    failure: &OperationFailure,
    checkpoints: &CheckpointManager,
    all_ops: &[OrderedOperation],
) -> RecoveryOutcome {
    if failure.can_recover && failure.retry_count < MAX_RETRIES {
        return RecoveryOutcome {
            strategy: RecoveryStrategy::Retry,
            recovered: false,
            content: None,
        };
    }

    if failure.can_recover {
        tracing::warn!(
            op = %failure.operation_id,
            retries = failure.retry_count,
            "retries exhausted, discarding operation"
        );
        return RecoveryOutcome {
            strategy: RecoveryStrategy::Skip,
            recovered: true,
            content: None,
        };
    }

    if let Some(checkpoint) = checkpoints.latest() {
        match replay_from_checkpoint(checkpoint, all_ops, &failure.operation_id) {
            Ok(content) => {
                tracing::warn!(
                    op = %failure.operation_id,
                    checkpoint = %checkpoint.id,
                    "rolled back and replayed"
                );
                return RecoveryOutcome {
                    strategy: RecoveryStrategy::Rollback,
                    recovered: true,
                    content: Some(content),
                };
            }
            Err(err) => {
                tracing::warn!(op = %failure.operation_id, error = %err, "rollback replay failed");
            }
        }
    }

    RecoveryOutcome {
        strategy: RecoveryStrategy::Manual,
        recovered: false,
        content: None,
    }
}

/// Replay all operations newer than the checkpoint (excluding the failed
/// one) onto the checkpoint's content, in deterministic causal order.
fn replay_from_checkpoint(
    checkpoint: &DocumentCheckpoint,
    all_ops: &[OrderedOperation],
    skip: &OperationId,
) -> OtResult<String> {
    let later: Vec<OrderedOperation> = all_ops
        .iter()
        .filter(|op| op.timestamp > checkpoint.timestamp && &op.id != skip)
        .cloned()
        .collect();

    let mut content = checkpoint.content.clone();
    for op in clock::order_operations(&later) {
        content = match &op.op {
            EditOp::Text(text_op) => transform::apply(&content, text_op),
            EditOp::ChordPro(chord_op) => chordpro::apply_chordpro_operation(&content, chord_op)?,
        };
    }
    Ok(content)
}

/// Pre-flight checks for applying an operation after recovery.
///
/// Returns human-readable issues instead of failing; the caller decides
/// which issues are fatal. An empty list means the operation looks safe.
pub fn validate_operation_for_recovery(
    op: &OrderedOperation,
    current_content: &str,
    current_clock: &VectorClock,
) -> Vec<String> {
    let mut issues = Vec::new();

    if !clock::can_apply(op, current_clock) {
        for (user, required) in op.clock.iter() {
            let have = current_clock.get(user);
            if required > have {
                issues.push(format!(
                    "missing operations from {}: have counter {}, operation requires {}",
                    user, have, required
                ));
            }
        }
    }

    let len = current_content.chars().count();
    match &op.op {
        EditOp::Text(TextOp::Insert { position, .. }) => {
            if *position > len {
                issues.push(format!(
                    "insert position {} beyond content length {} (would clamp)",
                    position, len
                ));
            }
        }
        EditOp::Text(TextOp::Delete { position, length }) => {
            if *position > len {
                issues.push(format!(
                    "delete position {} beyond content length {} (would clamp)",
                    position, len
                ));
            } else if position + length > len {
                issues.push(format!(
                    "delete range {}..{} overshoots content length {} (would clamp)",
                    position,
                    position + length,
                    len
                ));
            }
        }
        EditOp::Text(TextOp::Retain { .. }) => {}
        EditOp::ChordPro(chord_op) => {
            let position = chord_op.position();
            if position > len {
                issues.push(format!(
                    "anchor position {} beyond content length {} (would clamp)",
                    position, len
                ));
            }
            let needs_span = !matches!(
                chord_op,
                ChordProOp::ChordInsert { .. } | ChordProOp::DirectiveInsert { .. }
            );
            if needs_span {
                let found = match chord_op {
                    ChordProOp::ChordModify { .. } => chordpro::extract_chords(current_content)
                        .iter()
                        .any(|s| s.start <= position && position < s.end),
                    _ => chordpro::extract_directives(current_content)
                        .iter()
                        .any(|s| s.start <= position && position < s.end),
                };
                if !found {
                    issues.push(format!(
                        "no chord or directive span containing position {}",
                        position
                    ));
                }
            }
        }
    }

    issues
}
