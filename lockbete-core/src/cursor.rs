//! Monotonic poll cursors.
//!
//! A cursor is the last-acknowledged position in an ordered event sequence.
//! Both variants share two invariants: the cursor never moves backward, and
//! once a row's key is at or below the cursor that row is never redelivered.

use serde::{Deserialize, Serialize};

/// Exclusive integer-id lower bound for tailing auth attempts.
///
/// Starts at zero, meaning "everything is new". Advancing uses the maximum
/// id observed across a batch, not the last row in result order, so the
/// cursor is correct regardless of how the store orders the batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct IdCursor(i64);

impl IdCursor {
    pub fn new() -> Self {
        Self(0)
    }

    #[inline]
    pub fn get(&self) -> i64 {
        self.0
    }

    /// Advances to `id` if it lies past the cursor. Returns whether the
    /// cursor moved; a stale or duplicate id leaves it untouched.
    pub fn advance_to(&mut self, id: i64) -> bool {
        if id > self.0 {
            self.0 = id;
            true
        } else {
            false
        }
    }
}

/// Composite sequence cursor: (timestamp in Unix milliseconds, row id).
///
/// Derived ordering is lexicographic over the field order, which gives the
/// strict tuple `>` comparison that closes the identical-timestamp
/// tie-breaking gap of a bare timestamp cursor.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SeqCursor {
    pub ts_ms: i64,
    pub id: i64,
}

impl SeqCursor {
    /// Advances to `next` if it lies strictly past the cursor.
    pub fn advance_to(&mut self, next: SeqCursor) -> bool {
        if next > *self {
            *self = next;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn id_cursor_starts_at_zero() {
        assert_eq!(IdCursor::new().get(), 0);
    }

    #[test]
    fn id_cursor_takes_batch_maximum_in_any_order() {
        let mut cur = IdCursor::new();
        for id in [5, 3, 9, 7] {
            cur.advance_to(id);
        }
        assert_eq!(cur.get(), 9);
    }

    #[test]
    fn id_cursor_never_moves_backward() {
        let mut cur = IdCursor::new();
        assert!(cur.advance_to(10));
        assert!(!cur.advance_to(4));
        assert!(!cur.advance_to(10));
        assert_eq!(cur.get(), 10);
    }

    #[test]
    fn seq_cursor_breaks_timestamp_ties_on_id() {
        let mut cur = SeqCursor { ts_ms: 1000, id: 4 };
        // Same timestamp, higher id: must still advance.
        assert!(cur.advance_to(SeqCursor { ts_ms: 1000, id: 5 }));
        // Same timestamp, lower id: stale, must not move.
        assert!(!cur.advance_to(SeqCursor { ts_ms: 1000, id: 3 }));
        assert_eq!(cur, SeqCursor { ts_ms: 1000, id: 5 });
    }

    #[test]
    fn seq_cursor_orders_by_timestamp_first() {
        let a = SeqCursor { ts_ms: 1000, id: 99 };
        let b = SeqCursor { ts_ms: 1001, id: 1 };
        assert!(b > a);
    }

    proptest! {
        // Cursor value after any advance sequence equals the running maximum
        // and never decreases mid-sequence.
        #[test]
        fn id_cursor_is_monotone(ids in proptest::collection::vec(0i64..1_000_000, 0..64)) {
            let mut cur = IdCursor::new();
            let mut prev = cur.get();
            for id in &ids {
                cur.advance_to(*id);
                prop_assert!(cur.get() >= prev);
                prev = cur.get();
            }
            prop_assert_eq!(cur.get(), ids.iter().copied().max().unwrap_or(0).max(0));
        }

        #[test]
        fn seq_cursor_is_monotone(
            steps in proptest::collection::vec((0i64..10_000, 0i64..10_000), 1..64)
        ) {
            let mut cur = SeqCursor { ts_ms: 0, id: 0 };
            let mut prev = cur;
            for (ts_ms, id) in steps {
                cur.advance_to(SeqCursor { ts_ms, id });
                prop_assert!(cur >= prev);
                prev = cur;
            }
        }
    }
}
