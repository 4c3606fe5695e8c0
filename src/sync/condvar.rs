/*!
 * Sequence-Counter Condition Variable
 *
 * Waiters snapshot a sequence counter, release their mutex and block on the
 * counter's address expecting the snapshot. Signals bump the counter before
 * waking, so a signal landing between the snapshot and the block makes the
 * block return immediately instead of being lost.
 *
 * Broadcast wakes one waiter and requeues the rest straight onto the bound
 * mutex's state word: they wake one at a time as the mutex is handed over
 * instead of all waking just to find the mutex taken.
 */

use super::mutex::HybridMutex;
use super::parking::{key_of, ParkOutcome, ParkingLotFutex, ParkingPrimitive, RequeueResult, WakeResult};
use crate::core::errors::{LockError, LockResult};
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::{Duration, Instant, SystemTime};
use tracing::trace;

/// No mutex bound yet
const UNBOUND: usize = 0;

/// When a wait gives up
#[derive(Debug, Clone, Copy)]
enum Deadline {
    Never,
    /// Monotonic clock
    At(Instant),
    /// Wall clock, as a thread-library timed wait receives it
    AtWallClock(SystemTime),
}

impl Deadline {
    /// Time left before the deadline, `None` for no deadline
    ///
    /// `TimedOut` once the deadline has passed.
    fn remaining(self) -> LockResult<Option<Duration>> {
        let left = match self {
            Deadline::Never => return Ok(None),
            Deadline::At(deadline) => deadline.checked_duration_since(Instant::now()),
            // A clock that stepped past the deadline counts as expired
            Deadline::AtWallClock(deadline) => deadline.duration_since(SystemTime::now()).ok(),
        };
        match left {
            Some(left) if !left.is_zero() => Ok(Some(left)),
            _ => Err(LockError::TimedOut),
        }
    }
}

/// Condition variable bound lazily to exactly one mutex
///
/// The binding records only the mutex's address; it is never dereferenced.
#[repr(C, align(64))]
pub struct SeqCondvar<P: ParkingPrimitive = ParkingLotFutex> {
    seq: AtomicU32,
    mutex: AtomicUsize,
    parker: P,
}

impl<P: ParkingPrimitive> SeqCondvar<P> {
    /// Condition variable with no bound mutex
    pub const fn new() -> Self {
        Self {
            seq: AtomicU32::new(0),
            mutex: AtomicUsize::new(UNBOUND),
            parker: P::INIT,
        }
    }

    /// Allocate a condition variable that lives for the rest of the process
    pub fn create() -> &'static Self {
        Box::leak(Box::new(Self::new()))
    }

    /// Release `mutex`, block until signalled, reacquire `mutex`
    ///
    /// May return without a matching signal; callers re-check their
    /// predicate. Fails with `InvalidArgument`, without releasing anything,
    /// if this condition variable is bound to a different mutex.
    pub fn wait(&self, mutex: &HybridMutex<P>) -> LockResult<()> {
        let snapshot = self.seq.load(Ordering::Acquire);
        self.bind(mutex)?;

        mutex.unlock();
        // Without a deadline the block cannot time out
        let _ = self.block(snapshot, Deadline::Never);
        mutex.lock_contended();
        Ok(())
    }

    /// Like [`wait`](Self::wait) but gives up at `deadline`
    ///
    /// Returns `TimedOut` once the deadline has passed. The mutex is held
    /// again on every return path except a binding error.
    pub fn wait_until(&self, mutex: &HybridMutex<P>, deadline: Instant) -> LockResult<()> {
        self.timed_wait(mutex, Deadline::At(deadline))
    }

    /// Like [`wait_until`](Self::wait_until) with a wall-clock deadline
    ///
    /// The remaining time is re-derived from the system clock before every
    /// block, so a clock step moves the effective timeout with it.
    pub fn wait_until_system(&self, mutex: &HybridMutex<P>, deadline: SystemTime) -> LockResult<()> {
        self.timed_wait(mutex, Deadline::AtWallClock(deadline))
    }

    /// Like [`wait_until`](Self::wait_until) with a relative timeout
    pub fn wait_timeout(&self, mutex: &HybridMutex<P>, timeout: Duration) -> LockResult<()> {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.wait_until(mutex, deadline),
            None => self.wait(mutex),
        }
    }

    /// [`wait`](Self::wait) for a lock_api guard
    pub fn wait_guard<T: ?Sized>(
        &self,
        guard: &mut lock_api::MutexGuard<'_, HybridMutex<P>, T>,
    ) -> LockResult<()> {
        // SAFETY: the guard proves the mutex is held; `wait` hands it back
        // held before returning, so the guard stays valid.
        let mutex = unsafe { lock_api::MutexGuard::mutex(guard).raw() };
        self.wait(mutex)
    }

    /// [`wait_until`](Self::wait_until) for a lock_api guard
    pub fn wait_guard_until<T: ?Sized>(
        &self,
        guard: &mut lock_api::MutexGuard<'_, HybridMutex<P>, T>,
        deadline: Instant,
    ) -> LockResult<()> {
        // SAFETY: as in `wait_guard`.
        let mutex = unsafe { lock_api::MutexGuard::mutex(guard).raw() };
        self.wait_until(mutex, deadline)
    }

    /// Wake one waiter
    pub fn signal(&self) -> WakeResult {
        self.seq.fetch_add(1, Ordering::Release);
        self.parker.wake(key_of(&self.seq), 1)
    }

    /// Wake one waiter and move every other onto the bound mutex
    ///
    /// Without a requeue-capable primitive every waiter is woken instead.
    pub fn broadcast(&self) -> RequeueResult {
        let mutex = self.mutex.load(Ordering::Acquire);
        if mutex == UNBOUND {
            // Nobody ever waited
            return RequeueResult::default();
        }

        self.seq.fetch_add(1, Ordering::Release);
        let result = self.parker.requeue(key_of(&self.seq), 1, mutex);
        trace!(
            woken = result.woken,
            requeued = result.requeued,
            parker = self.parker.name(),
            "condvar broadcast"
        );
        result
    }

    /// No-op: the memory of a condition variable is never reclaimed
    pub fn destroy(&self) {}

    /// Current sequence value
    pub fn sequence(&self) -> u32 {
        self.seq.load(Ordering::Relaxed)
    }

    /// Whether `mutex` is the mutex this condition variable is bound to
    pub fn is_bound_to(&self, mutex: &HybridMutex<P>) -> bool {
        self.mutex.load(Ordering::Acquire) == mutex.state_key()
    }

    /// Whether any mutex has been bound
    pub fn is_bound(&self) -> bool {
        self.mutex.load(Ordering::Acquire) != UNBOUND
    }

    fn timed_wait(&self, mutex: &HybridMutex<P>, deadline: Deadline) -> LockResult<()> {
        let snapshot = self.seq.load(Ordering::Acquire);
        self.bind(mutex)?;

        mutex.unlock();
        let result = self.block(snapshot, deadline);
        mutex.lock_contended();

        if result.is_err() {
            trace!(?deadline, "condvar timed wait expired");
        }
        result
    }

    /// Bind to `mutex` on first use; reject any other mutex afterwards
    fn bind(&self, mutex: &HybridMutex<P>) -> LockResult<()> {
        let key = mutex.state_key();
        match self
            .mutex
            .compare_exchange(UNBOUND, key, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Ok(()),
            Err(current) if current == key => Ok(()),
            Err(_) => Err(LockError::InvalidArgument),
        }
    }

    /// Block on the sequence word while it still reads `snapshot`
    fn block(&self, snapshot: u32, deadline: Deadline) -> LockResult<()> {
        loop {
            let timeout = deadline.remaining()?;
            match self.parker.wait(&self.seq, snapshot, timeout) {
                // Re-derive the remaining time; `remaining` reports expiry
                ParkOutcome::TimedOut => continue,
                ParkOutcome::Woken | ParkOutcome::ValueChanged => {
                    return deadline.remaining().map(|_| ());
                }
            }
        }
    }
}

impl<P: ParkingPrimitive> Default for SeqCondvar<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ParkingPrimitive> fmt::Debug for SeqCondvar<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeqCondvar")
            .field("seq", &self.sequence())
            .field("bound", &self.is_bound())
            .field("parker", &self.parker.name())
            .finish()
    }
}
