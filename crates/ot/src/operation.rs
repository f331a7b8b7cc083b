//! Operation types for collaborative chord sheet editing.
//!
//! This module defines the two operation families the engine understands:
//! generic text edits (`TextOp`) and chord/directive markup edits
//! (`ChordProOp`), plus the `OrderedOperation` envelope that carries causal
//! metadata for either kind.
//!
//! All positions and lengths are **character** offsets into the
//! pre-operation content, never byte offsets.

use crate::clock::VectorClock;
use crate::op_id::{OperationId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A generic plain-text edit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextOp {
    /// Insert `content` at a 0-based character offset.
    Insert { position: usize, content: String },
    /// Delete `length` characters starting at `position`.
    Delete { position: usize, length: usize },
    /// Consume `length` characters without changing them.
    Retain { length: usize },
}

impl TextOp {
    /// Number of characters an Insert produces (0 for other variants).
    pub fn insert_len(&self) -> usize {
        match self {
            TextOp::Insert { content, .. } => content.chars().count(),
            _ => 0,
        }
    }

    /// The position this operation anchors at, if positional.
    pub fn position(&self) -> Option<usize> {
        match self {
            TextOp::Insert { position, .. } | TextOp::Delete { position, .. } => Some(*position),
            TextOp::Retain { .. } => None,
        }
    }

    /// Check if this is an insert.
    pub fn is_insert(&self) -> bool {
        matches!(self, TextOp::Insert { .. })
    }

    /// Check if this is a delete.
    pub fn is_delete(&self) -> bool {
        matches!(self, TextOp::Delete { .. })
    }

    /// Check if this is a retain.
    pub fn is_retain(&self) -> bool {
        matches!(self, TextOp::Retain { .. })
    }

    /// True for operations that cannot change content when applied:
    /// retains, empty inserts, and zero-length deletes.
    pub fn is_noop(&self) -> bool {
        match self {
            TextOp::Insert { content, .. } => content.is_empty(),
            TextOp::Delete { length, .. } => *length == 0,
            TextOp::Retain { .. } => true,
        }
    }
}

/// A chord as entered and as normalized for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordData {
    /// The chord text as the user typed it, e.g. "Am7".
    pub original: String,
    /// Canonical form used for rendering and transposition.
    pub normalized: String,
}

impl ChordData {
    pub fn new(original: impl Into<String>, normalized: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            normalized: normalized.into(),
        }
    }
}

/// A `{type: value}` directive payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectiveData {
    /// Directive type, e.g. "title", "key", "tempo".
    pub kind: String,
    /// Directive value.
    pub value: String,
}

impl DirectiveData {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

/// A domain-level edit to chord/directive markup.
///
/// Each variant carries the character offset it anchors at. Insert variants
/// splice new markup; Modify/Delete variants locate the existing span that
/// contains the anchor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChordProOp {
    /// Splice a new `[chord]` at `position`.
    ChordInsert { position: usize, chord: ChordData },
    /// Replace the `[chord]` span containing `position`.
    ChordModify { position: usize, chord: ChordData },
    /// Splice a new `{type: value}` at `position`.
    DirectiveInsert {
        position: usize,
        directive: DirectiveData,
    },
    /// Replace the `{...}` span containing `position`.
    DirectiveModify {
        position: usize,
        directive: DirectiveData,
    },
    /// Remove the `{...}` span containing `position`.
    DirectiveDelete { position: usize },
}

impl ChordProOp {
    /// The character offset this operation anchors at.
    pub fn position(&self) -> usize {
        match self {
            ChordProOp::ChordInsert { position, .. }
            | ChordProOp::ChordModify { position, .. }
            | ChordProOp::DirectiveInsert { position, .. }
            | ChordProOp::DirectiveModify { position, .. }
            | ChordProOp::DirectiveDelete { position } => *position,
        }
    }

    /// Return a copy of this operation anchored at a new position.
    pub fn with_position(&self, position: usize) -> Self {
        let mut op = self.clone();
        match &mut op {
            ChordProOp::ChordInsert { position: p, .. }
            | ChordProOp::ChordModify { position: p, .. }
            | ChordProOp::DirectiveInsert { position: p, .. }
            | ChordProOp::DirectiveModify { position: p, .. }
            | ChordProOp::DirectiveDelete { position: p } => *p = position,
        }
        op
    }
}

/// Either kind of edit, as carried by an `OrderedOperation`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditOp {
    Text(TextOp),
    ChordPro(ChordProOp),
}

impl EditOp {
    /// Get the text operation, if this is one.
    pub fn as_text(&self) -> Option<&TextOp> {
        match self {
            EditOp::Text(op) => Some(op),
            EditOp::ChordPro(_) => None,
        }
    }

    /// Get the chordpro operation, if this is one.
    pub fn as_chordpro(&self) -> Option<&ChordProOp> {
        match self {
            EditOp::ChordPro(op) => Some(op),
            EditOp::Text(_) => None,
        }
    }
}

impl From<TextOp> for EditOp {
    fn from(op: TextOp) -> Self {
        EditOp::Text(op)
    }
}

impl From<ChordProOp> for EditOp {
    fn from(op: ChordProOp) -> Self {
        EditOp::ChordPro(op)
    }
}

/// An operation stamped with causal metadata.
///
/// Created at edit time (local) or receipt time (remote), never mutated
/// afterwards. The vector clock reflects everything the originating peer
/// had seen when it produced the operation, including the operation itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderedOperation {
    /// Globally unique operation ID.
    pub id: OperationId,
    /// The edit itself.
    pub op: EditOp,
    /// Causal stamp at creation.
    pub clock: VectorClock,
    /// Originating peer.
    pub user_id: UserId,
    /// Wall-clock creation time (tie-breaker for concurrent operations).
    pub timestamp: DateTime<Utc>,
    /// Explicit operation dependencies, if the transport supplies them.
    #[serde(default)]
    pub dependencies: Vec<OperationId>,
}

impl OrderedOperation {
    /// Create a new ordered operation stamped now.
    pub fn new(op: impl Into<EditOp>, clock: VectorClock, user_id: UserId) -> Self {
        Self {
            id: OperationId::new(),
            op: op.into(),
            clock,
            user_id,
            timestamp: Utc::now(),
            dependencies: Vec::new(),
        }
    }

    /// Attach explicit dependencies.
    pub fn with_dependencies(mut self, dependencies: Vec<OperationId>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_len_counts_chars() {
        let op = TextOp::Insert {
            position: 0,
            content: "héllo".to_string(),
        };
        assert_eq!(op.insert_len(), 5);
    }

    #[test]
    fn test_text_op_predicates() {
        let insert = TextOp::Insert {
            position: 3,
            content: "x".to_string(),
        };
        assert!(insert.is_insert());
        assert!(!insert.is_delete());
        assert_eq!(insert.position(), Some(3));

        let retain = TextOp::Retain { length: 5 };
        assert!(retain.is_retain());
        assert!(retain.is_noop());
        assert_eq!(retain.position(), None);

        let empty_delete = TextOp::Delete {
            position: 2,
            length: 0,
        };
        assert!(empty_delete.is_noop());
    }

    #[test]
    fn test_chordpro_with_position() {
        let op = ChordProOp::ChordInsert {
            position: 4,
            chord: ChordData::new("Am7", "Am7"),
        };
        let moved = op.with_position(9);
        assert_eq!(moved.position(), 9);
        if let ChordProOp::ChordInsert { chord, .. } = moved {
            assert_eq!(chord.original, "Am7");
        } else {
            panic!("expected ChordInsert");
        }
    }

    #[test]
    fn test_serialize_deserialize_text_op() {
        let op = TextOp::Delete {
            position: 7,
            length: 3,
        };
        let json = serde_json::to_string(&op).unwrap();
        let back: TextOp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, op);
    }

    #[test]
    fn test_serialize_deserialize_ordered_operation() {
        let op = OrderedOperation::new(
            TextOp::Insert {
                position: 0,
                content: "[C]Hello".to_string(),
            },
            VectorClock::new(),
            UserId::new("alice"),
        );

        let json = serde_json::to_string(&op).unwrap();
        let back: OrderedOperation = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, op.id);
        assert_eq!(back.user_id, UserId::new("alice"));
        assert_eq!(back.op, op.op);
    }

    #[test]
    fn test_ordered_operation_dependencies_default() {
        // Wire messages may omit the dependencies field entirely.
        let json = format!(
            r#"{{"id":"op-1","op":{{"Text":{{"Retain":{{"length":1}}}}}},"clock":{{"entries":{{}}}},"user_id":"bob","timestamp":"{}"}}"#,
            Utc::now().to_rfc3339()
        );
        let op: OrderedOperation = serde_json::from_str(&json).unwrap();
        assert!(op.dependencies.is_empty());
    }
}
