/*!
 * Lock API Boundary
 *
 * Handle-based entry points shaped like a pthread shim: every call takes the
 * address of the caller's lock object as an opaque handle and returns 0 or a
 * POSIX errno. Handles resolve lazily, so statically initialized lock
 * objects that never went through an `*_init` call still work.
 */

use super::table::HandleTable;
use crate::core::errors::{to_errno, EINVAL};
use crate::core::types::Handle;
use crate::sync::{HybridMutex, MutexAttr, SeqCondvar};
use std::sync::OnceLock;
use std::time::SystemTime;
use tracing::trace;

/// Per-thread context slot for algorithms that need wait-queue nodes
///
/// The hybrid mutex has none; callers pass the empty marker.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LockContext;

/// Null handle, rejected everywhere
const NULL_HANDLE: Handle = 0;

static MUTEXES: OnceLock<HandleTable<HybridMutex>> = OnceLock::new();
static CONDVARS: OnceLock<HandleTable<SeqCondvar>> = OnceLock::new();

fn mutexes() -> &'static HandleTable<HybridMutex> {
    MUTEXES.get_or_init(HandleTable::new)
}

fn condvars() -> &'static HandleTable<SeqCondvar> {
    CONDVARS.get_or_init(HandleTable::new)
}

#[inline]
fn resolve_mutex(handle: Handle) -> &'static HybridMutex {
    mutexes().resolve_or_create(handle, HybridMutex::new)
}

#[inline]
fn resolve_condvar(handle: Handle) -> &'static SeqCondvar {
    condvars().resolve_or_create(handle, SeqCondvar::new)
}

/// Allocate a cache-line-aligned mutex that is never freed
pub fn create(attr: MutexAttr) -> &'static HybridMutex {
    HybridMutex::create(attr)
}

/// Number of mutex handles resolved so far
pub fn mutex_count() -> usize {
    mutexes().len()
}

/// Number of condition variable handles resolved so far
pub fn condvar_count() -> usize {
    condvars().len()
}

/// Install a mutex for `handle`
///
/// A handle that already has a mutex keeps it.
pub fn mutex_init(handle: Handle, attr: Option<MutexAttr>) -> i32 {
    if handle == NULL_HANDLE {
        return EINVAL;
    }
    let attr = attr.unwrap_or_default();
    mutexes().resolve_or_create(handle, || HybridMutex::with_attr(attr));
    trace!(handle, ?attr, "mutex init");
    0
}

/// Acquire the mutex behind `handle`
pub fn mutex_lock(handle: Handle, _ctx: &LockContext) -> i32 {
    if handle == NULL_HANDLE {
        return EINVAL;
    }
    resolve_mutex(handle).lock();
    0
}

/// Acquire the mutex behind `handle` only if it is free; `EBUSY` otherwise
pub fn mutex_trylock(handle: Handle, _ctx: &LockContext) -> i32 {
    if handle == NULL_HANDLE {
        return EINVAL;
    }
    to_errno(resolve_mutex(handle).try_lock())
}

/// Release the mutex behind `handle`
///
/// `EINVAL` for a handle that was never locked or initialized.
pub fn mutex_unlock(handle: Handle, _ctx: &LockContext) -> i32 {
    match mutexes().get(handle) {
        Some(mutex) => {
            mutex.unlock();
            0
        }
        None => EINVAL,
    }
}

/// Destroy the mutex behind `handle`
///
/// The instance stays installed: its memory is never reclaimed.
pub fn mutex_destroy(handle: Handle) -> i32 {
    if handle == NULL_HANDLE {
        return EINVAL;
    }
    if let Some(mutex) = mutexes().get(handle) {
        mutex.destroy();
    }
    0
}

/// Install a condition variable for `handle`
pub fn cond_init(handle: Handle) -> i32 {
    if handle == NULL_HANDLE {
        return EINVAL;
    }
    resolve_condvar(handle);
    0
}

/// Wait on `cond`, releasing and reacquiring `mutex`
pub fn cond_wait(cond: Handle, mutex: Handle, _ctx: &LockContext) -> i32 {
    if cond == NULL_HANDLE || mutex == NULL_HANDLE {
        return EINVAL;
    }
    to_errno(resolve_condvar(cond).wait(resolve_mutex(mutex)))
}

/// Wait on `cond` until the wall-clock `deadline`; `ETIMEDOUT` once it has passed
///
/// The deadline is absolute realtime, the way `pthread_cond_timedwait`
/// receives it. `mutex` is held again on return in every case except `EINVAL`.
pub fn cond_timed_wait(cond: Handle, mutex: Handle, _ctx: &LockContext, deadline: SystemTime) -> i32 {
    if cond == NULL_HANDLE || mutex == NULL_HANDLE {
        return EINVAL;
    }
    to_errno(resolve_condvar(cond).wait_until_system(resolve_mutex(mutex), deadline))
}

/// Wake one waiter of `cond`
pub fn cond_signal(cond: Handle) -> i32 {
    if cond == NULL_HANDLE {
        return EINVAL;
    }
    // Nobody can be waiting on a condition variable that was never resolved
    if let Some(condvar) = condvars().get(cond) {
        condvar.signal();
    }
    0
}

/// Wake all waiters of `cond`
pub fn cond_broadcast(cond: Handle) -> i32 {
    if cond == NULL_HANDLE {
        return EINVAL;
    }
    if let Some(condvar) = condvars().get(cond) {
        condvar.broadcast();
    }
    0
}

/// Destroy the condition variable behind `cond`
pub fn cond_destroy(cond: Handle) -> i32 {
    if cond == NULL_HANDLE {
        return EINVAL;
    }
    if let Some(condvar) = condvars().get(cond) {
        condvar.destroy();
    }
    0
}
