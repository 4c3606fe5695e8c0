/*!
 * Interposition Boundary
 *
 * What a thread-library shim calls into:
 * - `api`: handle-based mutex and condition variable calls returning errno
 * - `lifecycle`: process and thread setup hooks
 * - `table`: handle to instance resolution
 */

pub mod api;
mod lifecycle;
mod table;

pub use api::{
    cond_broadcast, cond_destroy, cond_init, cond_signal, cond_timed_wait, cond_wait,
    condvar_count, create, mutex_count, mutex_destroy, mutex_init, mutex_lock, mutex_trylock,
    mutex_unlock, LockContext,
};
pub use lifecycle::{
    application_exit, application_init, current_thread_id, spawn, thread_exit, thread_start,
};
pub use table::HandleTable;
