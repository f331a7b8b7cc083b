//! Chord and directive operations layered over generic text edits.
//!
//! Chord sheets carry two kinds of overlay markup: `[chord]` spans inline
//! with lyrics and `{type: value}` directive spans. This module applies and
//! transforms the domain operations for that markup, and exposes the span
//! scanner the embedding UI uses to locate markup in finalized content.
//!
//! The scanner is a small finite-state machine rather than a regex: span
//! offsets feed positional transforms, so predictable handling of
//! unterminated and nested brackets matters more than pattern brevity.

use crate::error::{EngineError, OtResult};
use crate::operation::{ChordProOp, TextOp};
use crate::transform;
use serde::{Deserialize, Serialize};

/// A located `[chord]` span. Offsets are character offsets into the
/// scanned content and include the brackets; `end` is exclusive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordSpan {
    pub start: usize,
    pub end: usize,
    /// Chord text without the brackets.
    pub text: String,
}

/// A located `{type: value}` span, delimiters included, `end` exclusive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectiveSpan {
    pub start: usize,
    pub end: usize,
    pub kind: String,
    pub value: String,
}

#[derive(Clone, Copy)]
enum ScanState {
    Text,
    /// Inside `[...]`, recording the char offset of the opening bracket.
    Chord(usize),
    /// Inside `{...}`, recording the char offset of the opening brace.
    Directive(usize),
}

/// Scan content for chord and directive spans in one pass.
///
/// Inside a span, nested opening delimiters are literal content; a span
/// left unterminated at end of input is not reported.
fn scan(content: &str) -> (Vec<ChordSpan>, Vec<DirectiveSpan>) {
    let mut chords = Vec::new();
    let mut directives = Vec::new();
    let mut state = ScanState::Text;
    let mut buf = String::new();

    for (idx, ch) in content.chars().enumerate() {
        match state {
            ScanState::Text => match ch {
                '[' => {
                    state = ScanState::Chord(idx);
                    buf.clear();
                }
                '{' => {
                    state = ScanState::Directive(idx);
                    buf.clear();
                }
                _ => {}
            },
            ScanState::Chord(start) => {
                if ch == ']' {
                    chords.push(ChordSpan {
                        start,
                        end: idx + 1,
                        text: buf.clone(),
                    });
                    state = ScanState::Text;
                } else {
                    buf.push(ch);
                }
            }
            ScanState::Directive(start) => {
                if ch == '}' {
                    let (kind, value) = split_directive(&buf);
                    directives.push(DirectiveSpan {
                        start,
                        end: idx + 1,
                        kind,
                        value,
                    });
                    state = ScanState::Text;
                } else {
                    buf.push(ch);
                }
            }
        }
    }

    (chords, directives)
}

/// Split directive body at the first colon; a body without a colon is all
/// kind with an empty value.
fn split_directive(body: &str) -> (String, String) {
    match body.split_once(':') {
        Some((kind, value)) => (kind.trim().to_string(), value.trim().to_string()),
        None => (body.trim().to_string(), String::new()),
    }
}

/// All `[chord]` spans in the content, in document order.
pub fn extract_chords(content: &str) -> Vec<ChordSpan> {
    scan(content).0
}

/// All `{type: value}` spans in the content, in document order.
pub fn extract_directives(content: &str) -> Vec<DirectiveSpan> {
    scan(content).1
}

fn chord_span_at(content: &str, position: usize) -> Option<ChordSpan> {
    extract_chords(content)
        .into_iter()
        .find(|span| span.start <= position && position < span.end)
}

fn directive_span_at(content: &str, position: usize) -> Option<DirectiveSpan> {
    extract_directives(content)
        .into_iter()
        .find(|span| span.start <= position && position < span.end)
}

/// Replace the character range `[start, end)` with `replacement`.
fn splice(content: &str, start: usize, end: usize, replacement: &str) -> String {
    let deleted = transform::apply(
        content,
        &TextOp::Delete {
            position: start,
            length: end - start,
        },
    );
    transform::apply(
        &deleted,
        &TextOp::Insert {
            position: start,
            content: replacement.to_string(),
        },
    )
}

/// Apply a chord/directive operation to content.
///
/// Inserts splice new markup at the clamped position and are total; modify
/// and delete variants fail with `SpanNotFound` when no span contains the
/// anchor (a concurrent edit may have removed it), which is the signal the
/// recovery manager acts on.
pub fn apply_chordpro_operation(content: &str, op: &ChordProOp) -> OtResult<String> {
    match op {
        ChordProOp::ChordInsert { position, chord } => Ok(transform::apply(
            content,
            &TextOp::Insert {
                position: *position,
                content: format!("[{}]", chord.original),
            },
        )),
        ChordProOp::ChordModify { position, chord } => {
            let span = chord_span_at(content, *position)
                .ok_or(EngineError::SpanNotFound(*position))?;
            Ok(splice(
                content,
                span.start,
                span.end,
                &format!("[{}]", chord.original),
            ))
        }
        ChordProOp::DirectiveInsert {
            position,
            directive,
        } => Ok(transform::apply(
            content,
            &TextOp::Insert {
                position: *position,
                content: format!("{{{}: {}}}", directive.kind, directive.value),
            },
        )),
        ChordProOp::DirectiveModify {
            position,
            directive,
        } => {
            let span = directive_span_at(content, *position)
                .ok_or(EngineError::SpanNotFound(*position))?;
            Ok(splice(
                content,
                span.start,
                span.end,
                &format!("{{{}: {}}}", directive.kind, directive.value),
            ))
        }
        ChordProOp::DirectiveDelete { position } => {
            let span = directive_span_at(content, *position)
                .ok_or(EngineError::SpanNotFound(*position))?;
            Ok(splice(content, span.start, span.end, ""))
        }
    }
}

/// Shift a chord/directive operation's anchor past an already-applied text
/// operation.
///
/// The anchor follows the same rules an Insert follows in the generic
/// transform: an insert at or before the anchor shifts it right, a delete
/// ending at or before it shifts it left, and a delete whose range contains
/// the anchor collapses it to the delete's start. Retain never moves it.
pub fn transform_chordpro_operation(chord_op: &ChordProOp, text_op: &TextOp) -> ChordProOp {
    let anchor = chord_op.position();
    let new_anchor = match text_op {
        TextOp::Insert { position, content } => {
            if *position <= anchor {
                anchor + transform::char_len(content)
            } else {
                anchor
            }
        }
        TextOp::Delete { position, length } => {
            if anchor >= position + length {
                anchor - length
            } else if anchor > *position {
                *position
            } else {
                anchor
            }
        }
        TextOp::Retain { .. } => anchor,
    };
    chord_op.with_position(new_anchor)
}
