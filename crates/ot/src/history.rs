//! Bounded operation history with undo/redo stacks.
//!
//! The history is a FIFO ring of `OrderedOperation` plus two stacks of
//! operation ids. Undo and redo are local-only conveniences: they never
//! rewrite the causal log, they synthesize *new* operations that the
//! embedding session stamps and broadcasts like any other edit.

use crate::operation::{EditOp, OrderedOperation, TextOp};
use crate::op_id::OperationId;
use crate::clock::VectorClock;
use crate::transform;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default bound on the number of retained operations.
pub const DEFAULT_MAX_HISTORY: usize = 500;

/// Bounded ring of operations plus undo/redo bookkeeping.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OperationHistory {
    /// Operations in arrival order, oldest first. Oldest evicted on overflow.
    operations: VecDeque<OrderedOperation>,
    /// Ids of undoable operations, most recent last.
    undo_stack: Vec<OperationId>,
    /// Ids of undone operations available for redo, most recent last.
    redo_stack: Vec<OperationId>,
    /// Ring bound.
    max_history_size: usize,
}

impl Default for OperationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl OperationHistory {
    /// Create a new history bounded to `max_history_size` operations.
    pub fn new(max_history_size: usize) -> Self {
        Self {
            operations: VecDeque::new(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_history_size: max_history_size.max(1),
        }
    }

    /// Record an operation.
    ///
    /// Returns `false` for a duplicate id (the transport is at-least-once).
    /// Text operations that are not themselves undo products are pushed onto
    /// the undo stack, and recording a fresh edit clears the redo stack.
    /// ChordPro operations live in the ring but are not undoable.
    pub fn add(&mut self, op: OrderedOperation, is_undo: bool) -> bool {
        if self.contains(&op.id) {
            return false;
        }

        if !is_undo {
            if matches!(op.op, EditOp::Text(_)) {
                self.undo_stack.push(op.id.clone());
            }
            self.redo_stack.clear();
        }

        self.operations.push_back(op);
        while self.operations.len() > self.max_history_size {
            if let Some(evicted) = self.operations.pop_front() {
                self.undo_stack.retain(|id| id != &evicted.id);
                self.redo_stack.retain(|id| id != &evicted.id);
            }
        }
        true
    }

    /// Look up an operation still in the ring.
    pub fn get(&self, id: &OperationId) -> Option<&OrderedOperation> {
        self.operations.iter().find(|op| &op.id == id)
    }

    /// Check if an operation id is still in the ring.
    pub fn contains(&self, id: &OperationId) -> bool {
        self.operations.iter().any(|op| &op.id == id)
    }

    /// Undo the most recent undoable operation.
    ///
    /// Pops the undo stack, inverts the operation against `current_content`,
    /// and moves the id to the redo stack. The returned operation is a
    /// normal edit: peers transform and apply it like any other; nothing is
    /// special-cased remotely.
    ///
    /// Inverting a Delete against the *current* content restores whatever
    /// now occupies the deleted range, which may differ from the removed
    /// text if later edits landed inside it. That is documented behavior:
    /// undo is a local convenience, not a history rewrite.
    pub fn perform_undo(&mut self, current_content: &str) -> Option<TextOp> {
        while let Some(id) = self.undo_stack.pop() {
            let Some(op) = self.get(&id) else {
                // Evicted from the ring; skip to the next candidate.
                continue;
            };
            let EditOp::Text(text_op) = &op.op else {
                continue;
            };
            let inverted = transform::invert(text_op, current_content);
            self.redo_stack.push(id);
            return Some(inverted);
        }
        None
    }

    /// Redo the most recently undone operation.
    ///
    /// Pops the redo stack, moves the id back onto the undo stack, and
    /// returns the original operation for re-application.
    pub fn perform_redo(&mut self) -> Option<TextOp> {
        while let Some(id) = self.redo_stack.pop() {
            let Some(op) = self.get(&id) else {
                continue;
            };
            let EditOp::Text(text_op) = &op.op else {
                continue;
            };
            let redone = text_op.clone();
            self.undo_stack.push(id);
            return Some(redone);
        }
        None
    }

    /// Operations not yet covered by the given clock (catch-up sync).
    pub fn ops_since(&self, clock: &VectorClock) -> Vec<&OrderedOperation> {
        self.operations
            .iter()
            .filter(|op| op.clock.get(&op.user_id) > clock.get(&op.user_id))
            .collect()
    }

    /// Iterate over retained operations, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &OrderedOperation> {
        self.operations.iter()
    }

    /// Number of operations currently retained.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Check if the history is empty.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Depth of the undo stack.
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Depth of the redo stack.
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Serialize to bytes (for an embedding service that persists history).
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op_id::UserId;
    use crate::operation::{ChordData, ChordProOp};
    use crate::transform::{apply, apply_all};

    fn text_op(op: TextOp) -> OrderedOperation {
        OrderedOperation::new(op, VectorClock::new(), UserId::new("alice"))
    }

    fn insert(position: usize, content: &str) -> TextOp {
        TextOp::Insert {
            position,
            content: content.to_string(),
        }
    }

    #[test]
    fn test_add_and_duplicate_suppression() {
        let mut history = OperationHistory::default();
        let op = text_op(insert(0, "a"));

        assert!(history.add(op.clone(), false));
        assert!(!history.add(op, false));
        assert_eq!(history.len(), 1);
        assert_eq!(history.undo_depth(), 1);
    }

    #[test]
    fn test_add_clears_redo_stack() {
        let mut history = OperationHistory::default();
        history.add(text_op(insert(0, "a")), false);

        let content = "a";
        assert!(history.perform_undo(content).is_some());
        assert_eq!(history.redo_depth(), 1);

        // A fresh edit invalidates redo.
        history.add(text_op(insert(0, "b")), false);
        assert_eq!(history.redo_depth(), 0);
        assert!(history.perform_redo().is_none());
    }

    #[test]
    fn test_undo_product_keeps_redo_stack() {
        let mut history = OperationHistory::default();
        history.add(text_op(insert(0, "a")), false);

        let undo_op = history.perform_undo("a").unwrap();
        assert_eq!(history.redo_depth(), 1);

        // Recording the synthesized undo must not clear the redo stack.
        history.add(text_op(undo_op), true);
        assert_eq!(history.redo_depth(), 1);
        assert!(history.perform_redo().is_some());
    }

    #[test]
    fn test_undo_redo_law() {
        let mut history = OperationHistory::default();
        let base = "Hello";
        let op = insert(5, " World");

        let after_op = apply(base, &op);
        history.add(text_op(op), false);

        let undo = history.perform_undo(&after_op).unwrap();
        let after_undo = apply(&after_op, &undo);
        assert_eq!(after_undo, base);

        let redo = history.perform_redo().unwrap();
        let after_redo = apply(&after_undo, &redo);
        assert_eq!(after_redo, after_op);
    }

    #[test]
    fn test_undo_inverts_delete_against_current_content() {
        let mut history = OperationHistory::default();
        let base = "Hello World";
        let op = TextOp::Delete {
            position: 5,
            length: 6,
        };

        let after = apply(base, &op);
        history.add(text_op(op), false);

        let undo = history.perform_undo(base).unwrap();
        assert_eq!(
            undo,
            TextOp::Insert {
                position: 5,
                content: " World".to_string()
            }
        );
        assert_eq!(apply(&after, &undo), base);
    }

    #[test]
    fn test_chordpro_ops_not_undoable() {
        let mut history = OperationHistory::default();
        let op = OrderedOperation::new(
            ChordProOp::ChordInsert {
                position: 0,
                chord: ChordData::new("C", "C"),
            },
            VectorClock::new(),
            UserId::new("alice"),
        );

        history.add(op, false);
        assert_eq!(history.len(), 1);
        assert_eq!(history.undo_depth(), 0);
        assert!(history.perform_undo("[C]").is_none());
    }

    #[test]
    fn test_eviction_oldest_first() {
        let mut history = OperationHistory::new(3);
        let ops: Vec<_> = (0..5).map(|i| text_op(insert(i, "x"))).collect();
        let first_id = ops[0].id.clone();

        for op in ops {
            history.add(op, false);
        }

        assert_eq!(history.len(), 3);
        assert!(!history.contains(&first_id));
        // Evicted ids must also leave the undo stack.
        assert_eq!(history.undo_depth(), 3);
    }

    #[test]
    fn test_ops_since() {
        let mut history = OperationHistory::default();
        let alice = UserId::new("alice");

        let mut clock = VectorClock::new();
        for i in 0..3 {
            clock.increment(&alice);
            let mut op = text_op(insert(i, "x"));
            op.clock = clock.clone();
            history.add(op, false);
        }

        let mut seen = VectorClock::new();
        seen.set(alice.clone(), 1);
        assert_eq!(history.ops_since(&seen).len(), 2);

        seen.set(alice, 3);
        assert!(history.ops_since(&seen).is_empty());
    }

    #[test]
    fn test_multi_step_undo_redo() {
        let mut history = OperationHistory::default();
        let mut content = String::new();

        let edits = vec![insert(0, "He"), insert(2, "llo")];
        for op in &edits {
            let next = apply(&content, op);
            history.add(text_op(op.clone()), false);
            content = next;
        }
        assert_eq!(content, "Hello");

        // Undo both, then redo both.
        let u1 = history.perform_undo(&content).unwrap();
        content = apply(&content, &u1);
        let u2 = history.perform_undo(&content).unwrap();
        content = apply(&content, &u2);
        assert_eq!(content, "");

        let r1 = history.perform_redo().unwrap();
        let r2 = history.perform_redo().unwrap();
        content = apply_all(&content, &[r1, r2]);
        assert_eq!(content, "Hello");
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut history = OperationHistory::new(10);
        history.add(text_op(insert(0, "Hi")), false);

        let bytes = history.to_bytes().unwrap();
        let restored = OperationHistory::from_bytes(&bytes).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.undo_depth(), 1);
    }
}
