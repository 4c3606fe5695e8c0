/*!
 * Thread-Local Segment State
 *
 * Each thread owns one `SegmentTracker`; nothing here is shared, so no
 * synchronization is needed. Accessors degrade to "no active segment" when
 * the thread-local has already been torn down (lock calls from destructors
 * during thread exit).
 */

use super::tracker::{Segment, SegmentEnd, SegmentTracker};
use super::SegmentError;
use crate::core::clock::ticks;
use crate::core::errors::fatal;
use crate::core::types::{SegmentId, Ticks};
use std::cell::RefCell;
use std::time::Duration;
use tracing::debug;

thread_local! {
    static TRACKER: RefCell<SegmentTracker> = const { RefCell::new(SegmentTracker::new()) };
}

/// Enter segment `id` on the calling thread
///
/// Exceeding the nesting depth terminates the process.
pub fn segment_start(id: SegmentId) -> Result<(), SegmentError> {
    let now = ticks();
    match TRACKER.with(|tracker| tracker.borrow_mut().start_at(id, now)) {
        Err(SegmentError::DepthExceeded(depth)) => {
            debug!(id, depth, "segment nesting overflow");
            fatal("segment nesting depth exceeded")
        }
        other => other,
    }
}

/// Leave segment `id`, feeding its duration back into its block timeout
///
/// `required_latency` is the budget for the segment, in ticks.
pub fn segment_end(id: SegmentId, required_latency: Ticks) -> Result<SegmentEnd, SegmentError> {
    let now = ticks();
    let end = TRACKER.with(|tracker| tracker.borrow_mut().end_at(id, required_latency, now))?;
    if end.adjusted {
        debug!(
            id,
            elapsed = end.elapsed,
            required_latency,
            wait_time = end.wait_time,
            unit = end.unit,
            "segment window updated"
        );
    }
    Ok(end)
}

/// Active segment of the calling thread
pub fn current_segment() -> Option<SegmentId> {
    TRACKER
        .try_with(|tracker| tracker.borrow().current())
        .ok()
        .flatten()
}

/// Copy of the calling thread's state for segment `id`
pub fn segment_snapshot(id: SegmentId) -> Option<Segment> {
    TRACKER
        .try_with(|tracker| tracker.borrow().segment(id).copied())
        .ok()
        .flatten()
}

/// Block timeout for the calling thread, `None` to block unbounded
#[inline]
pub(crate) fn block_timeout() -> Option<Duration> {
    TRACKER
        .try_with(|tracker| tracker.borrow().block_timeout())
        .ok()
        .flatten()
}

/// Mark the calling thread's active segment as having blocked
#[inline]
pub(crate) fn note_waiter() {
    let _ = TRACKER.try_with(|tracker| tracker.borrow_mut().note_waiter());
}

/// Drop all segment state of the calling thread
pub(crate) fn reset_thread() {
    let _ = TRACKER.try_with(|tracker| tracker.borrow_mut().reset());
}
