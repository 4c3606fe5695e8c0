/*!
 * Parking Primitive Traits
 *
 * The address-based block/wake/requeue capability the mutex and the
 * condition variable are built on.
 *
 * # Design: Monomorphized Capability
 *
 * `HybridMutex<P>` and `SeqCondvar<P>` take the primitive as a type
 * parameter. Implementations are zero-sized, so the abstraction costs
 * nothing at runtime and a primitive without requeue support can be swapped
 * in for testing the degraded broadcast path.
 */

use std::sync::atomic::AtomicU32;
use std::time::Duration;

/// Result of a wake operation
///
/// Compact representation (single usize) for efficient returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeResult {
    /// Successfully woke N waiters (N >= 1)
    Woken(usize),
    /// No waiters were parked on the address
    NoWaiters,
}

impl WakeResult {
    /// Build from a raw count of woken threads
    #[inline(always)]
    pub fn from_count(n: usize) -> Self {
        if n == 0 {
            WakeResult::NoWaiters
        } else {
            WakeResult::Woken(n)
        }
    }

    /// Check if any waiters were woken
    #[inline(always)]
    pub fn is_woken(&self) -> bool {
        matches!(self, WakeResult::Woken(_))
    }

    /// Get number of woken waiters (0 if none)
    #[inline(always)]
    pub fn count(&self) -> usize {
        match self {
            WakeResult::Woken(n) => *n,
            WakeResult::NoWaiters => 0,
        }
    }
}

/// Result of a combined wake-and-requeue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequeueResult {
    /// Threads woken on the source address
    pub woken: usize,
    /// Threads moved, still parked, onto the target address
    pub requeued: usize,
}

/// How a blocking wait returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParkOutcome {
    /// Woken by `wake` or `requeue`
    Woken,
    /// The timeout elapsed first
    TimedOut,
    /// The word no longer held the expected value, so the thread never slept
    ValueChanged,
}

/// Parking key of an atomic word: its address
#[inline(always)]
pub fn key_of(word: &AtomicU32) -> usize {
    word as *const AtomicU32 as usize
}

/// Address-based block/wake/requeue primitive
///
/// Implementations must be:
/// - **Atomic with respect to wake**: a wake issued after the word changed
///   must never be lost by a thread that is between its check and its sleep
/// - **Address keyed**: waiters are identified only by the word's address
pub trait ParkingPrimitive: Send + Sync {
    /// Instance usable in `const` initializers
    const INIT: Self;

    /// Block while `word` still holds `expected`
    ///
    /// `None` blocks without a timeout.
    fn wait(&self, word: &AtomicU32, expected: u32, timeout: Option<Duration>) -> ParkOutcome;

    /// Wake up to `count` threads parked on `key`
    fn wake(&self, key: usize, count: usize) -> WakeResult;

    /// Wake `wake_count` threads parked on `from` and move the rest onto `to`
    ///
    /// The default wakes everyone on `from` and lets them race. Correct, just
    /// more expensive under contention.
    fn requeue(&self, from: usize, wake_count: usize, to: usize) -> RequeueResult {
        let _ = (wake_count, to);
        RequeueResult {
            woken: self.wake(from, usize::MAX).count(),
            requeued: 0,
        }
    }

    /// Whether `requeue` actually transfers waiters
    fn supports_requeue(&self) -> bool {
        false
    }

    /// Get primitive name for debugging
    fn name(&self) -> &'static str;
}
