//! Wire-size reduction for operation batches.
//!
//! Consecutive operations from the same user within the same wall-clock
//! second are candidates for merging via `transform::compose`. A group is
//! replaced with its compressed form only when compression actually shrinks
//! it; otherwise the original operations go out untouched. Merging never
//! crosses user or time-bucket boundaries, so causal metadata stays honest.

use crate::clock::VectorClock;
use crate::op_id::{OperationId, UserId};
use crate::operation::{EditOp, OrderedOperation, TextOp};
use crate::transform;
use chrono::{DateTime, Utc};

/// Collapse adjacent composable operations in a sequence.
///
/// Folds left, trying to compose each operation with the previous result.
pub fn compress_operations(ops: &[TextOp]) -> Vec<TextOp> {
    let mut out: Vec<TextOp> = Vec::with_capacity(ops.len());
    for op in ops {
        match out.pop() {
            Some(last) => out.extend(transform::compose(&last, op)),
            None => out.push(op.clone()),
        }
    }
    out
}

/// Group key for bandwidth merging: one user, one wall-clock second.
fn bucket(op: &OrderedOperation) -> (UserId, i64) {
    (op.user_id.clone(), op.timestamp.timestamp())
}

/// Reduce a batch of stamped operations before sending it over the wire.
///
/// Only groups consisting entirely of text operations are compressed;
/// chord and directive operations pass through unchanged. Each merged
/// operation gets a fresh id, the pointwise-max of the group's clocks, the
/// union of the group's dependencies, and the group's latest timestamp.
pub fn optimize_for_bandwidth(ops: &[OrderedOperation]) -> Vec<OrderedOperation> {
    let mut out: Vec<OrderedOperation> = Vec::with_capacity(ops.len());
    let mut group: Vec<OrderedOperation> = Vec::new();

    for op in ops {
        if let Some(first) = group.first() {
            if bucket(first) != bucket(op) {
                flush_group(&mut out, std::mem::take(&mut group));
            }
        }
        group.push(op.clone());
    }
    flush_group(&mut out, group);

    if out.len() < ops.len() {
        tracing::debug!(
            before = ops.len(),
            after = out.len(),
            "merged operation batch for transmission"
        );
    }
    out
}

fn flush_group(out: &mut Vec<OrderedOperation>, group: Vec<OrderedOperation>) {
    if group.len() < 2 {
        out.extend(group);
        return;
    }

    let text_ops: Option<Vec<TextOp>> = group
        .iter()
        .map(|op| op.op.as_text().cloned())
        .collect();
    let Some(text_ops) = text_ops else {
        out.extend(group);
        return;
    };

    let compressed = compress_operations(&text_ops);
    if compressed.len() >= group.len() {
        out.extend(group);
        return;
    }

    let user_id = group[0].user_id.clone();
    let timestamp: DateTime<Utc> = group
        .iter()
        .map(|op| op.timestamp)
        .max()
        .unwrap_or_else(Utc::now);
    let mut clock = VectorClock::new();
    let mut dependencies: Vec<OperationId> = Vec::new();
    for op in &group {
        clock.merge(&op.clock);
        for dep in &op.dependencies {
            if !dependencies.contains(dep) {
                dependencies.push(dep.clone());
            }
        }
    }

    for text_op in compressed {
        out.push(OrderedOperation {
            id: OperationId::new(),
            op: EditOp::Text(text_op),
            clock: clock.clone(),
            user_id: user_id.clone(),
            timestamp,
            dependencies: dependencies.clone(),
        });
    }
}
