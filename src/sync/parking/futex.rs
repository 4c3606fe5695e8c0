/*!
 * Futex-Style Parking
 *
 * Uses parking_lot_core for futex-like operations on all platforms.
 * On Linux, parked threads ultimately sleep in futex syscalls.
 *
 * # Design
 *
 * parking_lot_core keeps a global hash table of parking buckets keyed by
 * address. The `validate` callback of `park` runs under the bucket lock and
 * every unpark takes the same lock, which gives the compare-and-block
 * semantics of `FUTEX_WAIT`: a waker that changes the word before waking can
 * never slip between a waiter's check and its sleep.
 * - Zero allocations on the hot path
 * - `unpark_requeue` moves waiters between keys like `FUTEX_REQUEUE`
 */

use super::traits::{key_of, ParkOutcome, ParkingPrimitive, RequeueResult, WakeResult};
use parking_lot_core::{
    park, unpark_all, unpark_one, unpark_requeue, ParkResult, RequeueOp, DEFAULT_PARK_TOKEN,
    DEFAULT_UNPARK_TOKEN,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// Futex-style parking on top of parking_lot_core
///
/// # Performance
///
/// - Zero-sized, every call is a direct function call
/// - Bucket lookup is a hash of the address
/// - Requeue is a single bucket-pair operation
#[derive(Debug, Clone, Copy, Default)]
pub struct ParkingLotFutex;

impl ParkingPrimitive for ParkingLotFutex {
    const INIT: Self = ParkingLotFutex;

    fn wait(&self, word: &AtomicU32, expected: u32, timeout: Option<Duration>) -> ParkOutcome {
        let key = key_of(word);
        // A deadline too far out to represent is the same as no deadline
        let deadline = timeout.and_then(|d| Instant::now().checked_add(d));

        // SAFETY: the callbacks neither panic nor call back into the parking
        // lot, and `key` is the address of a live word owned by the caller.
        let result = unsafe {
            park(
                key,
                || word.load(Ordering::Acquire) == expected,
                || {},
                |_key, _was_last| {},
                DEFAULT_PARK_TOKEN,
                deadline,
            )
        };

        match result {
            ParkResult::Unparked(_) => ParkOutcome::Woken,
            ParkResult::TimedOut => ParkOutcome::TimedOut,
            ParkResult::Invalid => ParkOutcome::ValueChanged,
        }
    }

    fn wake(&self, key: usize, count: usize) -> WakeResult {
        match count {
            0 => WakeResult::NoWaiters,
            usize::MAX => {
                // SAFETY: waking never dereferences `key`.
                let unparked = unsafe { unpark_all(key, DEFAULT_UNPARK_TOKEN) };
                WakeResult::from_count(unparked)
            }
            n => {
                let mut woken = 0;
                for _ in 0..n {
                    // SAFETY: as above.
                    let result = unsafe { unpark_one(key, |_| DEFAULT_UNPARK_TOKEN) };
                    woken += result.unparked_threads;
                    if !result.have_more_threads {
                        break;
                    }
                }
                WakeResult::from_count(woken)
            }
        }
    }

    fn requeue(&self, from: usize, wake_count: usize, to: usize) -> RequeueResult {
        let mut extra = 0;
        if wake_count > 1 {
            extra = self.wake(from, wake_count - 1).count();
        }

        // SAFETY: neither key is dereferenced; the callbacks do not park.
        let result = unsafe {
            unpark_requeue(
                from,
                to,
                || {
                    if wake_count == 0 {
                        RequeueOp::RequeueAll
                    } else {
                        RequeueOp::UnparkOneRequeueRest
                    }
                },
                |_op, _result| DEFAULT_UNPARK_TOKEN,
            )
        };

        RequeueResult {
            woken: extra + result.unparked_threads,
            requeued: result.requeued_threads,
        }
    }

    fn supports_requeue(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "futex"
    }
}
