/*!
 * Lifecycle Hooks
 * Process-wide and per-thread setup around lock usage
 *
 * Every thread that uses the locks is numbered densely from zero, the
 * process's first thread included. Ids are never reused; running out of
 * them terminates the process.
 */

use crate::core::errors::fatal;
use crate::core::limits::MAX_THREADS;
use crate::core::types::ThreadId;
use crate::monitoring::counters;
use crate::segment;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Once;
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

static APP_INIT: Once = Once::new();
static APP_EXITED: AtomicBool = AtomicBool::new(false);
static NEXT_THREAD_ID: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static THREAD_ID: Cell<Option<ThreadId>> = const { Cell::new(None) };
}

/// Process-wide setup; only the first call has any effect
///
/// Registers the calling thread as the first lock-using thread.
pub fn application_init() {
    APP_INIT.call_once(|| {
        let id = thread_start();
        info!(
            thread_id = id,
            max_threads = MAX_THREADS,
            "adaptive lock runtime initialized"
        );
    });
}

/// Process-wide teardown; only the first call has any effect
///
/// Reports the contention counters accumulated over the process lifetime.
pub fn application_exit() {
    if APP_EXITED.swap(true, Ordering::AcqRel) {
        return;
    }
    let snapshot = counters::snapshot();
    info!(
        spins = snapshot.spins,
        parks = snapshot.parks,
        wakes = snapshot.wakes,
        threads = NEXT_THREAD_ID.load(Ordering::Relaxed),
        "adaptive lock runtime exiting"
    );
}

/// Register the calling thread and reset its segment state
///
/// Returns the thread's id. A thread already registered keeps its id.
pub fn thread_start() -> ThreadId {
    if let Some(id) = current_thread_id() {
        return id;
    }

    let id = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
    if id >= MAX_THREADS {
        fatal("maximum number of lock-using threads reached");
    }

    THREAD_ID.with(|slot| slot.set(Some(id)));
    segment::reset_thread();
    debug!(thread_id = id, "thread registered");
    id
}

/// Per-thread teardown; there is nothing to release
pub fn thread_exit() {
    segment::reset_thread();
    if let Some(id) = current_thread_id() {
        debug!(thread_id = id, "thread exiting");
    }
}

/// Id assigned to the calling thread by [`thread_start`]
pub fn current_thread_id() -> Option<ThreadId> {
    THREAD_ID.try_with(|slot| slot.get()).ok().flatten()
}

/// Spawn a thread wrapped in [`thread_start`] / [`thread_exit`]
pub fn spawn<F, T>(f: F) -> JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    thread::spawn(move || {
        thread_start();
        let _exit = ThreadExit;
        f()
    })
}

/// Runs `thread_exit` even when the thread body panics
struct ThreadExit;

impl Drop for ThreadExit {
    fn drop(&mut self) {
        thread_exit();
    }
}
