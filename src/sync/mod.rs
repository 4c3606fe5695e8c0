/*!
 * Synchronization Primitives
 *
 * Spin-then-block mutex and its condition variable, both generic over the
 * parking primitive that suspends threads on a 32-bit word.
 *
 * # Architecture
 *
 * - `mutex`: state word, spin loop, park with the thread's segment timeout
 * - `tuner`: per-mutex spin budget driven by wake frequency
 * - `condvar`: sequence counter, broadcast requeues onto the mutex
 * - `parking`: compare-and-block / wake / requeue abstraction
 *
 * # Performance
 *
 * - Uncontended paths are a single atomic instruction
 * - Parking primitive is monomorphized, zero-sized by default
 * - Hot words are cache-line aligned to prevent false sharing
 */

mod condvar;
mod config;
mod mutex;
pub mod parking;
mod tuner;

pub use condvar::SeqCondvar;
pub use config::MutexAttr;
pub use mutex::{
    HybridMutex, Mutex, MutexGuard, MutexState, MutexStats, CONTENDED, FREE, LOCKED,
    LOCKED_CONTENDED,
};
pub use parking::{NoRequeue, ParkOutcome, ParkingLotFutex, ParkingPrimitive, RequeueResult, WakeResult};
pub use tuner::{Adjustment, SpinTuner};
