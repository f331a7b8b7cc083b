//! Pure transform algebra for text operations.
//!
//! This module implements the operational-transformation core: applying
//! operations to content, transforming one operation against another so
//! concurrent edits converge, composing adjacent operations, inverting
//! operations for undo, detecting conflicts, and diffing two strings into
//! an operation sequence.
//!
//! # Design rules
//!
//! - **Totality**: every function here is total over well-typed input.
//!   Out-of-range positions and lengths are clamped, never rejected, so a
//!   lossy transport can never wedge the engine.
//! - **Determinism**: ties between concurrent inserts at the same position
//!   are broken lexicographically by content, so both sides of a concurrent
//!   pair resolve identically.
//! - **Character addressing**: all positions and lengths count characters,
//!   not bytes.

use crate::operation::TextOp;

/// Number of characters in a string.
pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset of the given character index (clamped to the end).
fn byte_offset(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(b, _)| b)
        .unwrap_or(s.len())
}

/// Apply a single operation to content, producing the new content.
///
/// Insert splices at the clamped position, Delete removes the clamped
/// range, Retain is the identity.
pub fn apply(content: &str, op: &TextOp) -> String {
    match op {
        TextOp::Insert {
            position,
            content: text,
        } => {
            let pos = (*position).min(char_len(content));
            let at = byte_offset(content, pos);
            let mut out = String::with_capacity(content.len() + text.len());
            out.push_str(&content[..at]);
            out.push_str(text);
            out.push_str(&content[at..]);
            out
        }
        TextOp::Delete { position, length } => {
            let len = char_len(content);
            let start = (*position).min(len);
            let end = start.saturating_add(*length).min(len);
            let start_b = byte_offset(content, start);
            let end_b = byte_offset(content, end);
            let mut out = String::with_capacity(content.len());
            out.push_str(&content[..start_b]);
            out.push_str(&content[end_b..]);
            out
        }
        TextOp::Retain { .. } => content.to_string(),
    }
}

/// Fold `apply` over a sequence of operations, left to right.
pub fn apply_all(content: &str, ops: &[TextOp]) -> String {
    ops.iter()
        .fold(content.to_string(), |acc, op| apply(&acc, op))
}

/// Transform `op` so it applies correctly *after* `applied` has already
/// been applied, preserving the intent of both edits.
///
/// `applied` has positional priority on ties. Retain never participates in
/// conflicts: pairing with a Retain returns the other operand unchanged.
pub fn transform(applied: &TextOp, op: &TextOp) -> TextOp {
    match (applied, op) {
        (TextOp::Retain { .. }, _) | (_, TextOp::Retain { .. }) => op.clone(),

        (
            TextOp::Insert {
                position: pa,
                content: ca,
            },
            TextOp::Insert {
                position: pb,
                content: cb,
            },
        ) => {
            // Earlier insert shifts the later one; equal positions break
            // the tie lexicographically so both replicas agree.
            if pa < pb || (pa == pb && ca <= cb) {
                TextOp::Insert {
                    position: pb + char_len(ca),
                    content: cb.clone(),
                }
            } else {
                op.clone()
            }
        }

        (
            TextOp::Insert {
                position: pa,
                content: ca,
            },
            TextOp::Delete {
                position: pb,
                length: lb,
            },
        ) => {
            let ins_len = char_len(ca);
            if pa <= pb {
                // Insert at or before the delete start shifts it right.
                TextOp::Delete {
                    position: pb + ins_len,
                    length: *lb,
                }
            } else if *pa >= pb + lb {
                op.clone()
            } else {
                // Insert landed inside the deleted span: the delete now
                // consumes the inserted text as well.
                TextOp::Delete {
                    position: *pb,
                    length: lb + ins_len,
                }
            }
        }

        (
            TextOp::Delete {
                position: pa,
                length: la,
            },
            TextOp::Insert {
                position: pb,
                content: cb,
            },
        ) => {
            if pb <= pa {
                op.clone()
            } else if *pb >= pa + la {
                TextOp::Insert {
                    position: pb - la,
                    content: cb.clone(),
                }
            } else {
                // Insert anchor fell inside the deleted span: collapse to
                // the delete's start.
                TextOp::Insert {
                    position: *pa,
                    content: cb.clone(),
                }
            }
        }

        (
            TextOp::Delete {
                position: pa,
                length: la,
            },
            TextOp::Delete {
                position: pb,
                length: lb,
            },
        ) => {
            let a_end = pa + la;
            let b_end = pb + lb;
            if a_end <= *pb {
                TextOp::Delete {
                    position: pb - la,
                    length: *lb,
                }
            } else if b_end <= *pa {
                op.clone()
            } else {
                // Overlapping deletes: keep only the part of `op` that is
                // still present, so the overlap is not removed twice. The
                // surviving range is contiguous at min(pa, pb) once the
                // applied delete has collapsed the document.
                let overlap = a_end.min(b_end) - (*pa).max(*pb);
                TextOp::Delete {
                    position: (*pa).min(*pb),
                    length: lb - overlap,
                }
            }
        }
    }
}

/// Transform `op` against a whole sequence of already-applied operations.
pub fn transform_all(applied: &[TextOp], op: &TextOp) -> TextOp {
    applied
        .iter()
        .fold(op.clone(), |acc, prior| transform(prior, &acc))
}

/// Merge two adjacent same-type operations into one where possible.
///
/// Two inserts compose when the second continues exactly where the first
/// ended; two deletes compose when they start at the same position (a run
/// of forward deletes). Anything else comes back unchanged. Composition is
/// an optimization only; correctness never depends on it.
pub fn compose(a: &TextOp, b: &TextOp) -> Vec<TextOp> {
    match (a, b) {
        (
            TextOp::Insert {
                position: pa,
                content: ca,
            },
            TextOp::Insert {
                position: pb,
                content: cb,
            },
        ) if pa + char_len(ca) == *pb => {
            let mut content = ca.clone();
            content.push_str(cb);
            vec![TextOp::Insert {
                position: *pa,
                content,
            }]
        }
        (
            TextOp::Delete {
                position: pa,
                length: la,
            },
            TextOp::Delete {
                position: pb,
                length: lb,
            },
        ) if pa == pb => {
            vec![TextOp::Delete {
                position: *pa,
                length: la + lb,
            }]
        }
        _ => vec![a.clone(), b.clone()],
    }
}

/// Invert an operation against the content it was applied to.
///
/// The result undoes the operation: `apply(apply(c, op), invert(op, c)) == c`
/// for any content, including operations whose positions fall out of range
/// (the inverse is computed at the clamped, effective position).
pub fn invert(op: &TextOp, original: &str) -> TextOp {
    let len = char_len(original);
    match op {
        TextOp::Insert { position, content } => TextOp::Delete {
            position: (*position).min(len),
            length: char_len(content),
        },
        TextOp::Delete { position, length } => {
            let start = (*position).min(len);
            let end = start.saturating_add(*length).min(len);
            let start_b = byte_offset(original, start);
            let end_b = byte_offset(original, end);
            TextOp::Insert {
                position: start,
                content: original[start_b..end_b].to_string(),
            }
        }
        TextOp::Retain { length } => TextOp::Retain { length: *length },
    }
}

/// Check whether two operations touch overlapping character ranges.
///
/// An Insert exactly at a Delete's start or end boundary also counts as a
/// conflict: its placement relative to the removed text is ambiguous and
/// silent resolution could lose data.
pub fn operations_conflict(a: &TextOp, b: &TextOp) -> bool {
    match (a, b) {
        (TextOp::Retain { .. }, _) | (_, TextOp::Retain { .. }) => false,

        (TextOp::Insert { position: pa, .. }, TextOp::Insert { position: pb, .. }) => pa == pb,

        (
            TextOp::Insert { position: pi, .. },
            TextOp::Delete {
                position: pd,
                length: ld,
            },
        )
        | (
            TextOp::Delete {
                position: pd,
                length: ld,
            },
            TextOp::Insert { position: pi, .. },
        ) => *pd <= *pi && *pi <= pd + ld,

        (
            TextOp::Delete {
                position: pa,
                length: la,
            },
            TextOp::Delete {
                position: pb,
                length: lb,
            },
        ) => *pa < pb + lb && *pb < pa + la,
    }
}

/// True iff no pairwise conflict exists between the two operation lists.
///
/// The embedding session uses this to decide between automatic and manual
/// merge; a `false` result is a decision point, never an error.
pub fn can_auto_merge(ops_a: &[TextOp], ops_b: &[TextOp]) -> bool {
    ops_a
        .iter()
        .all(|a| ops_b.iter().all(|b| !operations_conflict(a, b)))
}

/// Diff two strings into a sequence of Delete/Insert operations.
///
/// This is a greedy, single-pass, character-anchored diff, not a minimal
/// edit script: it walks both strings, silently advances over matching
/// runs, and on a mismatch scans forward in both strings for the nearest
/// resynchronization point, emitting one Delete (old span) then one Insert
/// (new span). On interleaved edits it can produce larger-than-necessary
/// sequences; downstream transform correctness does not depend on
/// minimality.
pub fn generate_diff(old_text: &str, new_text: &str) -> Vec<TextOp> {
    let old: Vec<char> = old_text.chars().collect();
    let new: Vec<char> = new_text.chars().collect();
    let mut ops = Vec::new();
    let mut i = 0; // cursor into old
    let mut j = 0; // cursor into new == position in the patched document

    while i < old.len() || j < new.len() {
        if i < old.len() && j < new.len() && old[i] == new[j] {
            i += 1;
            j += 1;
            continue;
        }

        let (del, ins) = resync(&old[i..], &new[j..]);
        if del > 0 {
            ops.push(TextOp::Delete {
                position: j,
                length: del,
            });
        }
        if ins > 0 {
            ops.push(TextOp::Insert {
                position: j,
                content: new[j..j + ins].iter().collect(),
            });
        }
        i += del;
        j += ins;
    }

    ops
}

/// Smallest combined advance `(a, b)` after which `old[a..]` and `new[b..]`
/// start with the same character again, or both are exhausted.
fn resync(old: &[char], new: &[char]) -> (usize, usize) {
    for total in 1..=(old.len() + new.len()) {
        for a in 0..=total.min(old.len()) {
            let b = total - a;
            if b > new.len() {
                continue;
            }
            let old_done = a == old.len();
            let new_done = b == new.len();
            if (old_done && new_done) || (!old_done && !new_done && old[a] == new[b]) {
                return (a, b);
            }
        }
    }
    (old.len(), new.len())
}
