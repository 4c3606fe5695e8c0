/*!
 * Latency Segments
 *
 * Per-thread regions of code with a latency budget. The time a segment takes
 * end to end feeds back into the block timeout the mutex uses while that
 * segment is active:
 * - segment keeps within budget: the timeout grows, fewer wake syscalls
 * - segment overruns its budget: the timeout halves, faster re-polls
 *
 * Segments nest through a small per-thread stack. With no active segment
 * the mutex blocks without a timeout.
 */

mod local;
mod tracker;

use crate::core::types::SegmentId;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use local::{current_segment, segment_end, segment_snapshot, segment_start};
pub(crate) use local::{block_timeout, note_waiter, reset_thread};
pub use tracker::{Segment, SegmentEnd, SegmentTracker};

/// Segment bookkeeping errors
#[derive(Error, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SegmentError {
    #[error("Segment id {0} is out of range")]
    #[diagnostic(
        code(segment::invalid_id),
        help("Segment ids index a fixed per-thread table. Use an id below MAX_SEGMENTS.")
    )]
    InvalidId(SegmentId),

    #[error("Segment nesting exceeded depth {0}")]
    #[diagnostic(
        code(segment::depth_exceeded),
        help("Every segment_start needs a matching segment_end.")
    )]
    DepthExceeded(usize),

    #[error("Ending segment {found} while segment {expected} is active")]
    #[diagnostic(
        code(segment::mismatch),
        help("Segments must end in the reverse order they started.")
    )]
    Mismatch { expected: SegmentId, found: SegmentId },

    #[error("No segment is active on this thread")]
    #[diagnostic(code(segment::no_active_segment))]
    NoActiveSegment,
}
