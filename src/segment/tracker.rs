/*!
 * Segment Tracker
 *
 * The per-thread segment table and nesting stack. Timestamps are passed in
 * explicitly so the feedback arithmetic does not depend on the clock.
 */

use super::SegmentError;
use crate::core::limits::{
    ADJUST_UNIT_DIVISOR, DEFAULT_ADJUST_UNIT, DEFAULT_WAIT_TIME, MAX_SEGMENTS, MAX_SEGMENT_DEPTH,
    MIN_ADJUST_UNIT, MIN_WAIT_TIME, SEGMENT_REQ_THRESHOLD,
};
use crate::core::types::{SegmentId, Ticks};
use serde::Serialize;
use std::time::Duration;

/// Feedback state of one segment id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Segment {
    /// Block timeout handed to the mutex, in nanoseconds
    pub wait_time: u64,
    /// Step by which `wait_time` grows when the budget is met
    pub unit: u64,
    /// Tick count when the segment was last started
    pub start_timestamp: Ticks,
    /// Whether some lock call blocked while the segment was active
    pub has_waiter: bool,
}

impl Segment {
    const INITIAL: Segment = Segment {
        wait_time: DEFAULT_WAIT_TIME,
        unit: DEFAULT_ADJUST_UNIT,
        start_timestamp: 0,
        has_waiter: false,
    };
}

impl Default for Segment {
    fn default() -> Self {
        Self::INITIAL
    }
}

/// What `end` measured and decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SegmentEnd {
    pub id: SegmentId,
    /// Ticks between start and end
    pub elapsed: Ticks,
    /// Block timeout after the update
    pub wait_time: u64,
    /// Adjustment step after the update
    pub unit: u64,
    /// Whether a waiter was recorded, i.e. whether the window moved at all
    pub adjusted: bool,
}

/// Segment table, nesting stack and active id of one thread
#[derive(Debug, Clone)]
pub struct SegmentTracker {
    segments: [Segment; MAX_SEGMENTS],
    stack: [Option<SegmentId>; MAX_SEGMENT_DEPTH],
    depth: usize,
    current: Option<SegmentId>,
}

impl SegmentTracker {
    /// Fresh tracker, no active segment
    pub const fn new() -> Self {
        Self {
            segments: [Segment::INITIAL; MAX_SEGMENTS],
            stack: [None; MAX_SEGMENT_DEPTH],
            depth: 0,
            current: None,
        }
    }

    /// Restore every segment to its defaults and drop all nesting
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Active segment id, if any
    #[inline]
    pub fn current(&self) -> Option<SegmentId> {
        self.current
    }

    /// Number of enclosing segments saved on the stack
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// State of segment `id`
    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(id)
    }

    /// Block timeout the mutex should use now
    ///
    /// `None` (no active segment) means block without a timeout.
    #[inline]
    pub fn block_timeout(&self) -> Option<Duration> {
        self.current
            .map(|id| Duration::from_nanos(self.segments[id].wait_time))
    }

    /// Record that a lock call blocked inside the active segment
    #[inline]
    pub fn note_waiter(&mut self) {
        if let Some(id) = self.current {
            self.segments[id].has_waiter = true;
        }
    }

    /// Enter segment `id` at tick `now`, saving the enclosing segment
    pub fn start_at(&mut self, id: SegmentId, now: Ticks) -> Result<(), SegmentError> {
        if id >= MAX_SEGMENTS {
            return Err(SegmentError::InvalidId(id));
        }
        if self.depth == MAX_SEGMENT_DEPTH {
            return Err(SegmentError::DepthExceeded(MAX_SEGMENT_DEPTH));
        }

        self.stack[self.depth] = self.current;
        self.depth += 1;
        self.current = Some(id);
        self.segments[id].start_timestamp = now;
        Ok(())
    }

    /// Leave segment `id` at tick `now` and fold its duration into the window
    ///
    /// Only segments during which some lock call blocked move their window.
    /// The enclosing segment (or none) becomes active again.
    pub fn end_at(
        &mut self,
        id: SegmentId,
        required_latency: Ticks,
        now: Ticks,
    ) -> Result<SegmentEnd, SegmentError> {
        if id >= MAX_SEGMENTS {
            return Err(SegmentError::InvalidId(id));
        }
        let active = self.current.ok_or(SegmentError::NoActiveSegment)?;
        if active != id {
            return Err(SegmentError::Mismatch { expected: active, found: id });
        }

        let segment = &mut self.segments[id];
        let elapsed = now.saturating_sub(segment.start_timestamp);
        let adjusted = segment.has_waiter;

        if adjusted {
            if required_latency < SEGMENT_REQ_THRESHOLD {
                segment.wait_time = MIN_WAIT_TIME;
            } else if elapsed > required_latency {
                segment.wait_time >>= 1;
                segment.unit = (segment.wait_time / ADJUST_UNIT_DIVISOR).max(MIN_ADJUST_UNIT);
            } else {
                segment.wait_time = segment.wait_time.saturating_add(segment.unit);
            }
            segment.wait_time = segment.wait_time.max(MIN_WAIT_TIME);
        }
        segment.has_waiter = false;

        let report = SegmentEnd {
            id,
            elapsed,
            wait_time: segment.wait_time,
            unit: segment.unit,
            adjusted,
        };

        self.current = if self.depth == 0 {
            None
        } else {
            self.depth -= 1;
            self.stack[self.depth].take()
        };

        Ok(report)
    }
}

impl Default for SegmentTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn blocked_run(tracker: &mut SegmentTracker, id: SegmentId, duration: Ticks, budget: Ticks) -> SegmentEnd {
        tracker.start_at(id, 1_000).unwrap();
        tracker.note_waiter();
        tracker.end_at(id, budget, 1_000 + duration).unwrap()
    }

    #[test]
    fn test_no_segment_blocks_unbounded() {
        let tracker = SegmentTracker::new();
        assert_eq!(tracker.current(), None);
        assert_eq!(tracker.block_timeout(), None);
    }

    #[test]
    fn test_active_segment_supplies_timeout() {
        let mut tracker = SegmentTracker::new();
        tracker.start_at(3, 0).unwrap();
        assert_eq!(tracker.block_timeout(), Some(Duration::from_nanos(DEFAULT_WAIT_TIME)));
    }

    #[test]
    fn test_without_waiter_window_is_untouched() {
        let mut tracker = SegmentTracker::new();
        tracker.start_at(1, 0).unwrap();
        let end = tracker.end_at(1, 500, 1_000_000).unwrap();

        assert!(!end.adjusted);
        assert_eq!(end.wait_time, DEFAULT_WAIT_TIME);
        assert_eq!(end.unit, DEFAULT_ADJUST_UNIT);
        assert_eq!(end.elapsed, 1_000_000);
    }

    #[test]
    fn test_within_budget_grows_by_unit() {
        let mut tracker = SegmentTracker::new();
        let end = blocked_run(&mut tracker, 2, 100, 10_000);

        assert!(end.adjusted);
        assert_eq!(end.wait_time, DEFAULT_WAIT_TIME + DEFAULT_ADJUST_UNIT);
        assert!(!tracker.segment(2).unwrap().has_waiter);
    }

    #[test]
    fn test_overrun_halves_and_recomputes_unit() {
        let mut tracker = SegmentTracker::new();
        // Grow the window first so the halving lands above the floor
        for _ in 0..20 {
            blocked_run(&mut tracker, 4, 10, 10_000);
        }
        let grown = tracker.segment(4).unwrap().wait_time;
        assert_eq!(grown, DEFAULT_WAIT_TIME + 20 * DEFAULT_ADJUST_UNIT);

        let end = blocked_run(&mut tracker, 4, 50_000, 10_000);
        assert_eq!(end.wait_time, grown / 2);
        assert_eq!(end.unit, (grown / 2 / ADJUST_UNIT_DIVISOR).max(MIN_ADJUST_UNIT));
    }

    #[test]
    fn test_tight_budget_resets_to_floor() {
        let mut tracker = SegmentTracker::new();
        for _ in 0..5 {
            blocked_run(&mut tracker, 0, 10, 10_000);
        }
        let end = blocked_run(&mut tracker, 0, 10, SEGMENT_REQ_THRESHOLD - 1);
        assert_eq!(end.wait_time, MIN_WAIT_TIME);
    }

    #[test]
    fn test_repeated_overrun_converges_to_floor() {
        let mut tracker = SegmentTracker::new();
        for _ in 0..30 {
            blocked_run(&mut tracker, 7, 10, 10_000);
        }

        let mut previous = tracker.segment(7).unwrap().wait_time;
        for _ in 0..64 {
            let end = blocked_run(&mut tracker, 7, 1_000_000, 10_000);
            assert!(end.wait_time <= previous);
            assert!(end.wait_time >= MIN_WAIT_TIME);
            previous = end.wait_time;
        }
        assert_eq!(previous, MIN_WAIT_TIME);
    }

    #[test]
    fn test_nesting_restores_parent() {
        let mut tracker = SegmentTracker::new();
        tracker.start_at(1, 0).unwrap();
        tracker.start_at(2, 10).unwrap();
        assert_eq!(tracker.current(), Some(2));
        assert_eq!(tracker.depth(), 2);

        tracker.end_at(2, 1_000, 20).unwrap();
        assert_eq!(tracker.current(), Some(1));

        tracker.end_at(1, 1_000, 30).unwrap();
        assert_eq!(tracker.current(), None);
        assert_eq!(tracker.depth(), 0);
    }

    #[test]
    fn test_waiter_marks_only_active_segment() {
        let mut tracker = SegmentTracker::new();
        tracker.start_at(1, 0).unwrap();
        tracker.start_at(2, 0).unwrap();
        tracker.note_waiter();

        assert!(tracker.segment(2).unwrap().has_waiter);
        assert!(!tracker.segment(1).unwrap().has_waiter);
    }

    #[test]
    fn test_errors() {
        let mut tracker = SegmentTracker::new();
        assert_eq!(tracker.start_at(MAX_SEGMENTS, 0), Err(SegmentError::InvalidId(MAX_SEGMENTS)));
        assert_eq!(tracker.end_at(1, 0, 0), Err(SegmentError::NoActiveSegment));

        tracker.start_at(1, 0).unwrap();
        assert_eq!(
            tracker.end_at(2, 0, 0),
            Err(SegmentError::Mismatch { expected: 1, found: 2 })
        );
        // A rejected end leaves the segment active
        assert_eq!(tracker.current(), Some(1));
    }

    #[test]
    fn test_depth_limit() {
        let mut tracker = SegmentTracker::new();
        for i in 0..MAX_SEGMENT_DEPTH {
            tracker.start_at(i, 0).unwrap();
        }
        assert_eq!(
            tracker.start_at(0, 0),
            Err(SegmentError::DepthExceeded(MAX_SEGMENT_DEPTH))
        );
    }

    #[test]
    fn test_reset() {
        let mut tracker = SegmentTracker::new();
        blocked_run(&mut tracker, 5, 10, 10_000);
        tracker.start_at(5, 0).unwrap();
        tracker.reset();

        assert_eq!(tracker.current(), None);
        assert_eq!(*tracker.segment(5).unwrap(), Segment::default());
    }

    proptest! {
        #[test]
        fn prop_wait_time_never_below_floor(runs in prop::collection::vec((0u64..200_000, 0u64..200_000), 1..100)) {
            let mut tracker = SegmentTracker::new();
            for (duration, budget) in runs {
                let end = blocked_run(&mut tracker, 9, duration, budget);
                prop_assert!(end.wait_time >= MIN_WAIT_TIME);
                prop_assert!(end.unit >= MIN_ADJUST_UNIT);
            }
        }
    }
}
