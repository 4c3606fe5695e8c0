/*!
 * Adaptive Lock Library
 * Hybrid spin-then-block mutex and condition variable with self-tuning timing
 *
 * The mutex spins for a per-lock budget that follows how often unlocks have
 * to wake a sleeper, then blocks with a timeout taken from the calling
 * thread's active latency segment. The condition variable is a sequence
 * counter whose broadcast requeues waiters onto the mutex.
 */

#![cfg_attr(feature = "nightly", feature(core_intrinsics))]
#![cfg_attr(feature = "nightly", allow(internal_features))]

pub mod core;
pub mod interpose;
pub mod monitoring;
pub mod segment;
pub mod sync;

// Re-exports
pub use crate::core::errors::{LockError, LockResult};
pub use crate::core::limits;
pub use monitoring::{init_tracing, span_segment, ContentionSnapshot, SegmentSpan};
pub use segment::{
    current_segment, segment_end, segment_snapshot, segment_start, Segment, SegmentEnd,
    SegmentError, SegmentTracker,
};
pub use sync::{
    HybridMutex, Mutex, MutexAttr, MutexGuard, MutexState, MutexStats, NoRequeue,
    ParkingLotFutex, ParkingPrimitive, SeqCondvar,
};
