//! Vector clocks for causal ordering of operations.
//!
//! Each peer keeps a counter per user id; an absent entry means 0. Clocks
//! establish a happened-before partial order between operations, which the
//! engine extends to a deterministic total order for local application
//! (`order_operations`). That total order is deterministic for a given input
//! set but is not a global consensus order across replicas observing
//! different subsets.

use crate::op_id::UserId;
use crate::operation::OrderedOperation;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Causal relationship between two vector clocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CausalOrder {
    /// Every component <= the other's, at least one strictly less.
    Before,
    /// Every component >= the other's, at least one strictly greater.
    After,
    /// Components disagree in both directions.
    Concurrent,
    /// Identical clocks.
    Equal,
}

/// Vector clock: per-user monotonically increasing counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorClock {
    /// Map from user ID to highest seen counter.
    entries: HashMap<UserId, u64>,
}

impl VectorClock {
    /// Create a new empty vector clock.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Get the counter for a user (0 if absent).
    pub fn get(&self, user_id: &UserId) -> u64 {
        self.entries.get(user_id).copied().unwrap_or(0)
    }

    /// Set the counter for a user.
    pub fn set(&mut self, user_id: UserId, value: u64) {
        self.entries.insert(user_id, value);
    }

    /// Increment and return the counter for a user.
    pub fn increment(&mut self, user_id: &UserId) -> u64 {
        let next = self.get(user_id) + 1;
        self.entries.insert(user_id.clone(), next);
        next
    }

    /// Merge another clock into this one (pointwise max).
    pub fn merge(&mut self, other: &VectorClock) {
        for (user_id, &value) in &other.entries {
            let current = self.get(user_id);
            if value > current {
                self.entries.insert(user_id.clone(), value);
            }
        }
    }

    /// Return the pointwise max of two clocks without mutating either.
    pub fn merged(&self, other: &VectorClock) -> VectorClock {
        let mut out = self.clone();
        out.merge(other);
        out
    }

    /// Compare two clocks over the union of their keys.
    pub fn compare(&self, other: &VectorClock) -> CausalOrder {
        let mut less = false;
        let mut greater = false;

        for user_id in self.entries.keys().chain(other.entries.keys()) {
            let a = self.get(user_id);
            let b = other.get(user_id);
            if a < b {
                less = true;
            } else if a > b {
                greater = true;
            }
        }

        match (less, greater) {
            (false, false) => CausalOrder::Equal,
            (true, false) => CausalOrder::Before,
            (false, true) => CausalOrder::After,
            (true, true) => CausalOrder::Concurrent,
        }
    }

    /// Check if every component of this clock is >= the other's.
    pub fn dominates(&self, other: &VectorClock) -> bool {
        matches!(
            self.compare(other),
            CausalOrder::After | CausalOrder::Equal
        )
    }

    /// Check if this clock and the other are concurrent.
    pub fn concurrent(&self, other: &VectorClock) -> bool {
        self.compare(other) == CausalOrder::Concurrent
    }

    /// Users tracked by this clock, in sorted order.
    pub fn users(&self) -> BTreeSet<&UserId> {
        self.entries.keys().collect()
    }

    /// Check if the clock has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of users tracked.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate over all (user_id, counter) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&UserId, u64)> {
        self.entries.iter().map(|(k, &v)| (k, v))
    }
}

/// Check whether the receiver has seen everything `op` causally depends on.
///
/// True iff the current clock is `After` or `Equal` to the operation's
/// clock. A `false` result means the caller must buffer the operation until
/// its dependencies arrive; it is never an error.
pub fn can_apply(op: &OrderedOperation, current: &VectorClock) -> bool {
    matches!(
        current.compare(&op.clock),
        CausalOrder::After | CausalOrder::Equal
    )
}

/// Order operations for local application.
///
/// Causal predecessors sort before their successors; concurrent or equal
/// pairs are broken by timestamp ascending, then user id, then operation id
/// so the result is deterministic for any permutation of the same input set.
pub fn order_operations(ops: &[OrderedOperation]) -> Vec<OrderedOperation> {
    // Deterministic base order by (timestamp, user, id). This alone would
    // mis-order causally related ops whose wall clocks disagree, so a second
    // causal insertion pass fixes those inversions.
    let mut base: Vec<OrderedOperation> = ops.to_vec();
    base.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.user_id.cmp(&b.user_id))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut sorted: Vec<OrderedOperation> = Vec::with_capacity(base.len());
    for op in base {
        let pos = sorted
            .iter()
            .position(|placed| op.clock.compare(&placed.clock) == CausalOrder::Before)
            .unwrap_or(sorted.len());
        sorted.insert(pos, op);
    }
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{EditOp, TextOp};
    use chrono::{TimeZone, Utc};

    fn uid(name: &str) -> UserId {
        UserId::new(name)
    }

    fn op_with_clock(clock: VectorClock, user: &str, ts_millis: i64) -> OrderedOperation {
        let mut op = OrderedOperation::new(
            EditOp::Text(TextOp::Retain { length: 1 }),
            clock,
            uid(user),
        );
        op.timestamp = Utc.timestamp_millis_opt(ts_millis).unwrap();
        op
    }

    #[test]
    fn test_get_default_zero() {
        let clock = VectorClock::new();
        assert_eq!(clock.get(&uid("alice")), 0);
        assert!(clock.is_empty());
    }

    #[test]
    fn test_increment() {
        let mut clock = VectorClock::new();
        assert_eq!(clock.increment(&uid("alice")), 1);
        assert_eq!(clock.increment(&uid("alice")), 2);
        assert_eq!(clock.increment(&uid("bob")), 1);
        assert_eq!(clock.get(&uid("alice")), 2);
        assert_eq!(clock.len(), 2);
    }

    #[test]
    fn test_merge_pointwise_max() {
        let mut a = VectorClock::new();
        a.set(uid("alice"), 3);
        a.set(uid("bob"), 5);

        let mut b = VectorClock::new();
        b.set(uid("alice"), 5);
        b.set(uid("carol"), 2);

        a.merge(&b);
        assert_eq!(a.get(&uid("alice")), 5);
        assert_eq!(a.get(&uid("bob")), 5);
        assert_eq!(a.get(&uid("carol")), 2);
    }

    #[test]
    fn test_compare_equal() {
        let mut a = VectorClock::new();
        a.set(uid("alice"), 1);
        let b = a.clone();
        assert_eq!(a.compare(&b), CausalOrder::Equal);
    }

    #[test]
    fn test_compare_before_after() {
        let mut a = VectorClock::new();
        a.set(uid("alice"), 1);

        let mut b = VectorClock::new();
        b.set(uid("alice"), 2);
        b.set(uid("bob"), 1);

        assert_eq!(a.compare(&b), CausalOrder::Before);
        assert_eq!(b.compare(&a), CausalOrder::After);
    }

    #[test]
    fn test_compare_concurrent() {
        let mut a = VectorClock::new();
        a.set(uid("alice"), 2);
        a.set(uid("bob"), 1);

        let mut b = VectorClock::new();
        b.set(uid("alice"), 1);
        b.set(uid("bob"), 2);

        assert_eq!(a.compare(&b), CausalOrder::Concurrent);
        assert!(a.concurrent(&b));
    }

    #[test]
    fn test_compare_absent_key_is_zero() {
        let a = VectorClock::new();
        let mut b = VectorClock::new();
        b.set(uid("alice"), 1);
        assert_eq!(a.compare(&b), CausalOrder::Before);
    }

    #[test]
    fn test_merge_dominates_both_inputs() {
        let mut a = VectorClock::new();
        a.set(uid("alice"), 2);
        a.set(uid("bob"), 1);

        let mut b = VectorClock::new();
        b.set(uid("alice"), 1);
        b.set(uid("bob"), 3);

        let merged = a.merged(&b);
        assert!(merged.dominates(&a));
        assert!(merged.dominates(&b));
    }

    #[test]
    fn test_can_apply() {
        let mut seen = VectorClock::new();
        seen.set(uid("alice"), 2);
        seen.set(uid("bob"), 1);

        let mut dep_met = VectorClock::new();
        dep_met.set(uid("alice"), 2);
        let op = op_with_clock(dep_met, "alice", 0);
        assert!(can_apply(&op, &seen));

        let mut dep_gap = VectorClock::new();
        dep_gap.set(uid("carol"), 1);
        let op = op_with_clock(dep_gap, "carol", 0);
        assert!(!can_apply(&op, &seen));
    }

    #[test]
    fn test_order_operations_causal_chain() {
        let mut c1 = VectorClock::new();
        c1.set(uid("u1"), 1);

        let mut c2 = VectorClock::new();
        c2.set(uid("u1"), 2);
        c2.set(uid("u2"), 1);

        let mut c3 = VectorClock::new();
        c3.set(uid("u1"), 3);
        c3.set(uid("u2"), 2);

        let op1 = op_with_clock(c1, "u1", 100);
        let op2 = op_with_clock(c2, "u2", 200);
        let op3 = op_with_clock(c3, "u1", 300);

        // Every permutation must come back in chain order.
        let shuffles = [
            vec![op1.clone(), op2.clone(), op3.clone()],
            vec![op3.clone(), op1.clone(), op2.clone()],
            vec![op2.clone(), op3.clone(), op1.clone()],
            vec![op3.clone(), op2.clone(), op1.clone()],
        ];
        for input in shuffles {
            let ordered = order_operations(&input);
            assert_eq!(ordered[0].id, op1.id);
            assert_eq!(ordered[1].id, op2.id);
            assert_eq!(ordered[2].id, op3.id);
        }
    }

    #[test]
    fn test_order_operations_causal_order_beats_timestamp() {
        let mut c1 = VectorClock::new();
        c1.set(uid("u1"), 1);
        let mut c2 = VectorClock::new();
        c2.set(uid("u1"), 2);

        // Successor has the *earlier* wall clock; causality must win.
        let first = op_with_clock(c1, "u1", 900);
        let second = op_with_clock(c2, "u1", 100);

        let ordered = order_operations(&[second.clone(), first.clone()]);
        assert_eq!(ordered[0].id, first.id);
        assert_eq!(ordered[1].id, second.id);
    }

    #[test]
    fn test_order_operations_concurrent_by_timestamp() {
        let mut ca = VectorClock::new();
        ca.set(uid("alice"), 1);
        let mut cb = VectorClock::new();
        cb.set(uid("bob"), 1);

        let a = op_with_clock(ca, "alice", 500);
        let b = op_with_clock(cb, "bob", 200);

        let ordered = order_operations(&[a.clone(), b.clone()]);
        assert_eq!(ordered[0].id, b.id);
        assert_eq!(ordered[1].id, a.id);
    }

    #[test]
    fn test_clock_serialization() {
        let mut clock = VectorClock::new();
        clock.set(uid("alice"), 3);
        clock.set(uid("bob"), 5);

        let json = serde_json::to_string(&clock).unwrap();
        let back: VectorClock = serde_json::from_str(&json).unwrap();
        assert_eq!(back, clock);
    }
}
