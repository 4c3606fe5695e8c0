/*!
 * Hybrid Mutex
 *
 * Spin-then-block mutex on a single atomic state word.
 *
 * # State word
 *
 * - bit 0 (`LOCKED`): some thread holds the mutex
 * - bit 8 (`CONTENDED`): some thread may be parked on the word
 *
 * FREE -> LOCKED -> LOCKED_CONTENDED -> (wake + reacquire) -> LOCKED or FREE
 *
 * # Acquisition
 *
 * 1. one atomic set of `LOCKED`
 * 2. spin for the tuned budget (in clock ticks), retrying 1
 * 3. swap the whole word to `LOCKED_CONTENDED`; a clear `LOCKED` in the old
 *    value still means the lock was won
 * 4. park on the word while it reads `LOCKED_CONTENDED`, with the active
 *    segment's timeout or unbounded when no segment is active
 *
 * # Release
 *
 * An uncontended release is one compare-and-swap. A contended release clears
 * `LOCKED`, gives spinners a short window to take the lock over, and only
 * then clears `CONTENDED` and wakes one parked thread.
 *
 * There is no lock protecting the lock: every mutation is one atomic
 * instruction, and parking is the only suspension point.
 */

use super::config::MutexAttr;
use super::parking::{key_of, ParkOutcome, ParkingLotFutex, ParkingPrimitive};
use super::tuner::{Adjustment, SpinTuner};
use crate::core::clock::spin_for;
use crate::core::errors::{LockError, LockResult};
use crate::core::hints::{delay_spins, likely};
use crate::core::limits::MAX_SPIN_TICKS;
use crate::core::types::CachePadded;
use crate::monitoring::counters;
use crate::segment;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::trace;

/// State word value of an unheld mutex
pub const FREE: u32 = 0;
/// Held bit
pub const LOCKED: u32 = 1;
/// Waiters-may-be-parked bit
pub const CONTENDED: u32 = 1 << 8;
/// Held with possible waiters
pub const LOCKED_CONTENDED: u32 = LOCKED | CONTENDED;

/// Decoded state word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutexState {
    Free,
    Locked,
    LockedContended,
    /// Released, wake of a parked thread still pending
    Contended,
}

impl MutexState {
    fn from_bits(bits: u32) -> Self {
        match (bits & LOCKED != 0, bits & CONTENDED != 0) {
            (false, false) => MutexState::Free,
            (true, false) => MutexState::Locked,
            (true, true) => MutexState::LockedContended,
            (false, true) => MutexState::Contended,
        }
    }
}

/// Snapshot of a mutex's state and tuning counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MutexStats {
    pub state: MutexState,
    pub spin_ticks: u32,
    pub unlock_count: u64,
    pub wake_count: u32,
}

/// Spin budget of one contended acquisition
///
/// Starts from the tuned budget and doubles after every timed park, up to
/// `MAX_SPIN_TICKS`. Lives only as long as the call; the tuner is untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Backoff(u64);

impl Backoff {
    fn new(spin_ticks: u32) -> Self {
        Self(u64::from(spin_ticks))
    }

    #[inline]
    fn ticks(self) -> u64 {
        self.0
    }

    fn grow(&mut self) {
        self.0 = self.0.saturating_mul(2).min(u64::from(MAX_SPIN_TICKS));
    }
}

/// Spin/block mutex with a self-tuning spin budget
///
/// # Performance
///
/// - Uncontended lock and unlock are one atomic each
/// - State word and each tuning counter sit on their own cache line
/// - Parking primitive is a type parameter, zero-sized by default
#[repr(C, align(64))]
pub struct HybridMutex<P: ParkingPrimitive = ParkingLotFutex> {
    state: CachePadded<AtomicU32>,
    tuner: SpinTuner,
    unlock_delay: u32,
    parker: P,
}

impl<P: ParkingPrimitive> HybridMutex<P> {
    /// Unlocked mutex with default attributes
    pub const fn new() -> Self {
        Self::with_attr(MutexAttr::new())
    }

    /// Unlocked mutex with explicit attributes
    pub const fn with_attr(attr: MutexAttr) -> Self {
        Self {
            state: CachePadded::new(AtomicU32::new(FREE)),
            tuner: SpinTuner::new(attr.effective_spin_ticks()),
            unlock_delay: attr.unlock_delay_spins,
            parker: P::INIT,
        }
    }

    /// Allocate a mutex that lives for the rest of the process
    ///
    /// The allocation is cache-line aligned. `destroy` never frees it.
    pub fn create(attr: MutexAttr) -> &'static Self {
        Box::leak(Box::new(Self::with_attr(attr)))
    }

    /// Acquire the mutex, spinning then blocking as needed
    #[inline]
    pub fn lock(&self) {
        if likely(self.try_acquire()) {
            return;
        }
        self.lock_slow();
    }

    /// Acquire the mutex only if it is free right now
    ///
    /// Never spins or blocks.
    #[inline]
    pub fn try_lock(&self) -> LockResult<()> {
        if self.try_acquire() {
            Ok(())
        } else {
            Err(LockError::Busy)
        }
    }

    /// Release the mutex
    ///
    /// Calling this without holding the mutex breaks mutual exclusion for
    /// whoever does hold it.
    #[inline]
    pub fn unlock(&self) {
        if likely(
            self.state.load(Ordering::Relaxed) == LOCKED
                && self
                    .state
                    .compare_exchange(LOCKED, FREE, Ordering::Release, Ordering::Relaxed)
                    .is_ok(),
        ) {
            return;
        }
        self.unlock_slow();
    }

    /// No-op: the memory of a mutex is never reclaimed
    ///
    /// Destroying a mutex that is held or waited on is a caller error.
    pub fn destroy(&self) {}

    /// Whether some thread holds the mutex
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.state.load(Ordering::Relaxed) & LOCKED != 0
    }

    /// Decoded state word
    pub fn state(&self) -> MutexState {
        MutexState::from_bits(self.state.load(Ordering::Relaxed))
    }

    /// The spin tuner of this mutex
    pub fn tuner(&self) -> &SpinTuner {
        &self.tuner
    }

    /// Snapshot of state and tuning counters
    pub fn stats(&self) -> MutexStats {
        MutexStats {
            state: self.state(),
            spin_ticks: self.tuner.spin_ticks(),
            unlock_count: self.tuner.unlock_count(),
            wake_count: self.tuner.wake_count(),
        }
    }

    /// Parking key of the state word, used by condition variables to requeue
    #[inline]
    pub(crate) fn state_key(&self) -> usize {
        key_of(&self.state)
    }

    /// Set `LOCKED`; `true` if it was clear
    #[inline(always)]
    fn try_acquire(&self) -> bool {
        self.try_acquire_with(LOCKED)
    }

    /// Set `bits` (which include `LOCKED`); `true` if `LOCKED` was clear
    #[inline(always)]
    fn try_acquire_with(&self, bits: u32) -> bool {
        self.state.fetch_or(bits, Ordering::Acquire) & LOCKED == 0
    }

    /// Swap to `LOCKED_CONTENDED`; `true` if the lock was free
    #[inline(always)]
    fn acquire_contended(&self) -> bool {
        self.state.swap(LOCKED_CONTENDED, Ordering::Acquire) & LOCKED == 0
    }

    #[cold]
    fn lock_slow(&self) {
        let mut backoff = Backoff::new(self.tuner.spin_ticks());
        // Once parked, other threads may still be parked too; keep CONTENDED
        // set on acquisition so our unlock wakes them
        let mut acquire_bits = LOCKED;

        loop {
            if spin_for(backoff.ticks(), || self.try_acquire_with(acquire_bits)) {
                counters::record_spin();
                return;
            }

            if self.acquire_contended() {
                return;
            }

            match segment::block_timeout() {
                Some(timeout) => {
                    self.park(Some(timeout));
                    segment::note_waiter();
                    acquire_bits = LOCKED_CONTENDED;
                    backoff.grow();
                }
                None => {
                    // No latency budget to honour: stay parked until woken
                    self.park(None);
                    self.lock_contended();
                    return;
                }
            }
        }
    }

    /// Acquire by repeatedly swapping to `LOCKED_CONTENDED` and parking
    ///
    /// Used after a first park and when a condition-variable waiter comes
    /// back to its mutex. Leaves the word contended, so the eventual unlock
    /// wakes the next parked thread.
    pub(crate) fn lock_contended(&self) {
        while !self.acquire_contended() {
            let timeout = segment::block_timeout();
            self.park(timeout);
            if timeout.is_some() {
                segment::note_waiter();
            }
        }
    }

    fn park(&self, timeout: Option<Duration>) -> ParkOutcome {
        counters::record_park();
        let outcome = self.parker.wait(&self.state, LOCKED_CONTENDED, timeout);
        trace!(?outcome, ?timeout, parker = self.parker.name(), "mutex park returned");
        outcome
    }

    #[cold]
    fn unlock_slow(&self) {
        if let Some(adjustment) = self.tuner.record_unlock() {
            if !matches!(adjustment, Adjustment::Unchanged(_)) {
                trace!(?adjustment, "mutex spin budget re-tuned");
            }
        }

        self.state.fetch_and(!LOCKED, Ordering::SeqCst);
        if self.state.load(Ordering::SeqCst) & LOCKED != 0 {
            // Taken over by a spinner; its unlock sees CONTENDED and wakes
            return;
        }

        delay_spins(self.unlock_delay);
        if self.state.load(Ordering::SeqCst) & LOCKED != 0 {
            return;
        }

        self.state.fetch_and(!CONTENDED, Ordering::SeqCst);
        self.tuner.record_wake();
        counters::record_wake();
        let woken = self.parker.wake(self.state_key(), 1);
        trace!(woken = woken.count(), "mutex unlock woke waiter");
    }
}

impl<P: ParkingPrimitive> Default for HybridMutex<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ParkingPrimitive> fmt::Debug for HybridMutex<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HybridMutex")
            .field("stats", &self.stats())
            .field("parker", &self.parker.name())
            .finish()
    }
}

// SAFETY: the lock_api contract holds: `lock`/`try_lock` only return once
// LOCKED was set by this call, and `unlock` clears it.
unsafe impl<P: ParkingPrimitive> lock_api::RawMutex for HybridMutex<P> {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self::new();

    type GuardMarker = lock_api::GuardSend;

    #[inline]
    fn lock(&self) {
        HybridMutex::lock(self);
    }

    #[inline]
    fn try_lock(&self) -> bool {
        self.try_acquire()
    }

    #[inline]
    unsafe fn unlock(&self) {
        HybridMutex::unlock(self);
    }

    #[inline]
    fn is_locked(&self) -> bool {
        HybridMutex::is_locked(self)
    }
}

/// Data-carrying mutex over `HybridMutex`
pub type Mutex<T> = lock_api::Mutex<HybridMutex, T>;

/// RAII guard of [`Mutex`]
pub type MutexGuard<'a, T> = lock_api::MutexGuard<'a, HybridMutex, T>;
