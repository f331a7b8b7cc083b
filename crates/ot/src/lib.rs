//! Operational transformation engine for collaborative chord sheet editing.
//!
//! This crate implements character-addressed operational transformation for
//! plain text plus an overlay of ChordPro markup (`[chord]` spans and
//! `{type: value}` directives), with vector-clock causality tracking,
//! bounded history with undo/redo, checkpoint-based recovery, and
//! bandwidth-oriented batch compression.
//!
//! # Modules
//!
//! - `operation`: Operation types (text edits, chord/directive edits, the stamped envelope)
//! - `transform`: Apply, transform, compose, invert, conflict detection, diff generation
//! - `clock`: Vector clocks, causal ordering, dependency gating
//! - `chordpro`: Markup scanning and chord/directive operations
//! - `document`: Document state holding content, version, and causal stamp
//! - `history`: Bounded operation history with undo/redo stacks
//! - `recovery`: Checkpoints and failure recovery strategies
//! - `optimize`: Batch compression before transmission
//! - `op_id`: User and operation identifiers
//! - `error`: Error types for the engine
//!
//! # Example
//!
//! ```
//! use ot::document::DocumentState;
//! use ot::op_id::UserId;
//! use ot::operation::TextOp;
//!
//! let alice = UserId::new("alice");
//! let mut doc = DocumentState::new("Hello", alice.clone());
//!
//! // Stamp a local edit and apply it.
//! let op = doc.stamp_local(
//!     TextOp::Insert { position: 5, content: " World".to_string() },
//!     &alice,
//! );
//! doc.apply_operation(&op).unwrap();
//!
//! assert_eq!(doc.content, "Hello World");
//! assert_eq!(doc.version, 1);
//! ```

pub mod chordpro;
pub mod clock;
pub mod document;
pub mod error;
pub mod history;
pub mod op_id;
pub mod operation;
pub mod optimize;
pub mod recovery;
pub mod transform;

// Re-export commonly used types
pub use chordpro::{ChordSpan, DirectiveSpan};
pub use clock::{can_apply, order_operations, CausalOrder, VectorClock};
pub use document::DocumentState;
pub use error::{EngineError, OtResult};
pub use history::{OperationHistory, DEFAULT_MAX_HISTORY};
pub use op_id::{OperationId, UserId};
pub use operation::{ChordData, ChordProOp, DirectiveData, EditOp, OrderedOperation, TextOp};
pub use optimize::{compress_operations, optimize_for_bandwidth};
pub use recovery::{
    attempt_recovery, CheckpointManager, DocumentCheckpoint, OperationFailure, RecoveryOutcome,
    RecoveryStrategy, MAX_RETRIES,
};
pub use transform::{
    apply, can_auto_merge, compose, generate_diff, invert, operations_conflict, transform,
    transform_all,
};
